//! Durable sinks.
//!
//! Every entry is handed to the ledger's sink before it becomes visible in
//! memory. A sink error aborts the append, so a failed write never leaves a
//! half-recorded entry behind.

use crate::error::{LedgerError, LedgerResult};
use access_types::LedgerEntry;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait LedgerSink: Send + Sync {
    fn append(&self, entry: &LedgerEntry) -> LedgerResult<()>;
}

/// Discards entries; the in-memory arena is the only copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LedgerSink for NullSink {
    fn append(&self, _entry: &LedgerEntry) -> LedgerResult<()> {
        Ok(())
    }
}

/// Appends one JSON document per entry to a file.
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlFileSink {
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| LedgerError::Io(format!("{}: {}", path.display(), err)))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerSink for JsonlFileSink {
    fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| LedgerError::Backend("sink lock poisoned".to_string()))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|err| LedgerError::WriteFault(format!("{}: {}", self.path.display(), err)))
    }
}

/// Read every entry from a JSONL ledger file, in file order. Blank lines are
/// skipped; a missing file reads as empty.
pub fn read_jsonl(path: impl AsRef<Path>) -> LedgerResult<Vec<LedgerEntry>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(LedgerError::Io(format!("{}: {}", path.display(), err))),
    };

    let mut entries = vec![];
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| LedgerError::Io(err.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|err| {
            LedgerError::Serialization(format!("line {}: {}", number + 1, err))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
