//! Sequential batch reader over a packed-double input file.

use crate::error::{Result, SolverError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::num::FpCategory;
use std::path::{Path, PathBuf};

/// `true` iff `x`'s IEEE classification is `Normal` or `Zero`, the only
/// classes the pipeline treats as valid data. Subnormals, infinities, and
/// NaN are dropped before anything downstream sees them.
pub fn is_valid(x: f64) -> bool {
    matches!(x.classify(), FpCategory::Normal | FpCategory::Zero)
}

/// Sequential, non-seeking reader that yields fixed-size batches of valid
/// `f64` values read from a file of packed little-endian IEEE-754 doubles.
pub struct InputStream {
    reader: BufReader<File>,
    path: PathBuf,
    eof: bool,
}

impl InputStream {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| SolverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(InputStream {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            eof: false,
        })
    }

    /// Reads up to `max_count` doubles, dropping invalid values, and
    /// returns them. An empty, non-`None` batch is possible mid-stream if
    /// an entire chunk happened to be invalid; `None` means EOF was
    /// reached with nothing further to read. A trailing run of fewer than
    /// 8 bytes at end-of-file is silently discarded.
    pub fn next_batch(&mut self, max_count: usize) -> Result<Option<Vec<f64>>> {
        if self.eof {
            return Ok(None);
        }
        let mut raw = vec![0u8; max_count * 8];
        let mut filled = 0usize;
        while filled < raw.len() {
            let n = self
                .reader
                .read(&mut raw[filled..])
                .map_err(|source| SolverError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
        }
        let whole_doubles = filled / 8;
        if whole_doubles == 0 {
            return Ok(None);
        }
        let mut batch = Vec::with_capacity(whole_doubles);
        for chunk in raw[..whole_doubles * 8].chunks_exact(8) {
            let bytes: [u8; 8] = chunk.try_into().expect("chunks_exact(8) yields 8 bytes");
            let value = f64::from_le_bytes(bytes);
            if is_valid(value) {
                batch.push(value);
            }
        }
        Ok(Some(batch))
    }
}
