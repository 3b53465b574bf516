use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;

use crate::particles::{ParticleCounts, ParticleReader, Posterior};

/// Normalize weighted particles into per-identifier probabilities.
///
/// Reads `identifier,value,log_weight` records and writes
/// `identifier,value,probability` rows to stdout.
#[derive(Parser, Debug)]
#[command(name = "collate", version, about, long_about = None)]
pub struct CliInputs {
    /// Particle files to read, in order. `-` or no files reads stdin.
    #[arg(value_name = "INPUTS")]
    inputs: Vec<PathBuf>,
}

impl CliInputs {
    pub fn read_cli() -> Self {
        CliInputs::parse()
    }

    pub fn sources(&self) -> Vec<InputSource> {
        if self.inputs.is_empty() {
            return vec![InputSource::Stdin];
        }
        self.inputs
            .iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    InputSource::Stdin
                } else {
                    InputSource::File(path.clone())
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn name(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// Counts every particle record in `sources`, stopping at the first bad one.
pub fn read_sources(sources: &[InputSource]) -> Result<ParticleCounts> {
    let mut counts = ParticleCounts::new();
    for source in sources {
        let name = source.name();
        let read = match source {
            InputSource::Stdin => counts.read_csv(&name, io::stdin().lock()),
            InputSource::File(path) => {
                let file =
                    File::open(path).with_context(|| format!("failed to open {}", name))?;
                counts.read_csv(&name, file)
            }
        };
        read.with_context(|| format!("failed to read {}", name))?;
    }
    Ok(counts)
}

#[derive(Serialize)]
struct OutputRow<'a> {
    identifier: &'a str,
    value: &'a str,
    probability: String,
}

pub fn format_probability(probability: f64) -> String {
    format!("{:.6}", probability)
}

/// Writes one `identifier,value,probability` row per posterior, no header.
pub fn write_posteriors<W: Write>(writer: W, posteriors: &[Posterior]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .from_writer(writer);
    for posterior in posteriors {
        csv_writer.serialize(OutputRow {
            identifier: &posterior.identifier,
            value: &posterior.value,
            probability: format_probability(posterior.probability),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
