//! JSON sidecar output.
//!
//! - `save_summary_json` writes `{"excerpt": [...], "breached_databases": N}`.
//! - `load_summary_json` reads one back into the same [`Summary`].
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub excerpt: Vec<String>,
    pub breached_databases: usize,
}

pub fn save_summary_json<P: AsRef<Path>>(summary: &Summary, path: P) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, summary)
        .with_context(|| format!("serialize summary to {}", path.display()))?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

pub fn load_summary_json<P: AsRef<Path>>(path: P) -> Result<Summary> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let summary = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse summary {}", path.display()))?;
    Ok(summary)
}
