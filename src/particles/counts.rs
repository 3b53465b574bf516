use std::collections::hash_map::{self, HashMap};
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Read};

use csv::{ByteRecord, StringRecord};
use tracing::debug;

use crate::error::{CollateError, Result};
use crate::particles::traits::ParticleReader;

/// One distinct `(identifier, value, log_weight)` observation.
///
/// Weights compare by exact value: two keys merge only when their weights are
/// the same float. `-0.0` is stored as `0.0` so both zero spellings merge.
#[derive(Clone, Debug)]
pub struct ParticleKey {
    pub identifier: String,
    pub value: String,
    pub log_weight: f64,
}

impl ParticleKey {
    pub fn new(identifier: impl Into<String>, value: impl Into<String>, log_weight: f64) -> Self {
        let log_weight = if log_weight == 0.0 { 0.0 } else { log_weight };
        Self {
            identifier: identifier.into(),
            value: value.into(),
            log_weight,
        }
    }
}

impl PartialEq for ParticleKey {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.value == other.value
            && self.log_weight.to_bits() == other.log_weight.to_bits()
    }
}

impl Eq for ParticleKey {}

impl Hash for ParticleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.value.hash(state);
        self.log_weight.to_bits().hash(state);
    }
}

/// Multiplicity of every distinct particle seen in the input.
#[derive(Debug, Default)]
pub struct ParticleCounts {
    counts: HashMap<ParticleKey, u64>,
    records: u64,
}

impl ParticleCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one observation of `(identifier, value, log_weight)`.
    pub fn observe(&mut self, identifier: &str, value: &str, log_weight: f64) {
        *self
            .counts
            .entry(ParticleKey::new(identifier, value, log_weight))
            .or_insert(0) += 1;
        self.records += 1;
    }

    /// Counts one raw CSV record. Fields past the weight are ignored.
    pub fn observe_record(
        &mut self,
        source_name: &str,
        line: u64,
        record: &StringRecord,
    ) -> Result<()> {
        if record.len() < 3 {
            return Err(CollateError::parse(
                source_name,
                line,
                format!(
                    "expected identifier,value,log_weight but found {} field(s)",
                    record.len()
                ),
            ));
        }
        let log_weight = parse_log_weight(&record[2])
            .map_err(|reason| CollateError::parse(source_name, line, reason))?;
        self.observe(&record[0], &record[1], log_weight);
        Ok(())
    }

    pub fn get(&self, key: &ParticleKey) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Number of distinct particles.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of records counted, duplicates included.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn iter(&self) -> hash_map::Iter<'_, ParticleKey, u64> {
        self.counts.iter()
    }
}

impl<'a> IntoIterator for &'a ParticleCounts {
    type Item = (&'a ParticleKey, &'a u64);
    type IntoIter = hash_map::Iter<'a, ParticleKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

impl ParticleReader for ParticleCounts {
    /// Reads one record per line. Fields split on `,` with no quoting, and a
    /// trailing `\r` is dropped. Every line must hold a record: an empty line
    /// is a parse error like any other short record.
    fn read_csv<R: Read>(&mut self, source_name: &str, reader: R) -> Result<u64> {
        let mut reader = BufReader::new(reader);
        let before = self.records;
        let mut buf = Vec::new();
        let mut line = 0u64;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line += 1;

            let raw = strip_terminator(&buf);
            if raw.is_empty() {
                return Err(CollateError::parse(source_name, line, "empty record"));
            }
            let record: ByteRecord = raw.split(|&b| b == b',').collect();
            let record = StringRecord::from_byte_record(record).map_err(|e| {
                CollateError::parse(
                    source_name,
                    line,
                    format!("field {} is not valid UTF-8", e.utf8_error().field() + 1),
                )
            })?;
            self.observe_record(source_name, line, &record)?;
        }

        let read = self.records - before;
        debug!(
            source = source_name,
            records = read,
            distinct = self.counts.len(),
            "read particle records"
        );
        Ok(read)
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_log_weight(field: &str) -> std::result::Result<f64, String> {
    let trimmed = field.trim();
    let weight: f64 = trimmed
        .parse()
        .map_err(|_| format!("log-weight '{}' is not a floating-point number", field))?;
    if weight.is_nan() || weight == f64::INFINITY {
        return Err(format!("log-weight '{}' is not a usable log-weight", field));
    }
    Ok(weight)
}
