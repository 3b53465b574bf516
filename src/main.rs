use anyhow::Result;
use particle_collate::{collate, read_sources, write_posteriors, CliInputs};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries only the normalized rows; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = CliInputs::read_cli();
    let counts = read_sources(&cli.sources())?;
    tracing::debug!(
        records = counts.records(),
        distinct = counts.len(),
        "aggregated input"
    );

    // Nothing is written until every stage has succeeded.
    let posteriors = collate(&counts)?;
    let stdout = std::io::stdout();
    write_posteriors(stdout.lock(), &posteriors)?;

    Ok(())
}
