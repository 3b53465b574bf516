use std::io::Read;

use crate::error::Result;

pub trait ParticleReader {
    /// Absorbs every `identifier,value,log_weight` record from `reader`,
    /// returning how many records were read. `source_name` labels errors.
    fn read_csv<R: Read>(&mut self, source_name: &str, reader: R) -> Result<u64>;
}
