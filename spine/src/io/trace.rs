//! JSON-lines pulse traces: one serialized report per line.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

pub struct TraceWriter {
    path: PathBuf,
    out: BufWriter<File>,
    lines: u64,
}

impl TraceWriter {
    /// Create (or truncate) the trace file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("create trace {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)
            .with_context(|| format!("serialize trace record to {}", self.path.display()))?;
        self.out
            .write_all(b"\n")
            .with_context(|| format!("write trace {}", self.path.display()))?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn finish(mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("flush trace {}", self.path.display()))
    }
}
