//! Report export.
//!
//! The text report starts with the root and then lists every record in input
//! order:
//!
//! ```text
//! Root = 0x<root>
//!
//! Wallet Address : <record>
//! Proof : [0x<sibling>,...]
//! Verify result : true
//!
//! ```

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::{hex_encode, write_file_atomic};
use crate::error::AllowlistError;
use crate::hasher::Hash;
use crate::proof::MerkleProof;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    Proven { proof: MerkleProof, verified: bool },
    /// No proof could be produced; the reason is shown in the report.
    Unprocessable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub record: String,
    pub leaf: Hash,
    pub leaf_index: Option<usize>,
    pub outcome: ProofOutcome,
}

impl ReportEntry {
    pub fn verified(&self) -> bool {
        matches!(self.outcome, ProofOutcome::Proven { verified: true, .. })
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wallet Address : {}", self.record)?;
        match &self.outcome {
            ProofOutcome::Proven { proof, verified } => {
                writeln!(f, "Proof : {proof}")?;
                writeln!(f, "Verify result : {verified}")?;
            }
            ProofOutcome::Unprocessable(reason) => {
                writeln!(f, "Proof : unprocessable ({reason})")?;
                writeln!(f, "Verify result : false")?;
            }
        }
        writeln!(f)
    }
}

/// Root plus one entry per input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub root: Hash,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn verified_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.verified()).count()
    }

    pub fn to_json(&self) -> ReportJson {
        ReportJson {
            root: hex_encode(self.root),
            entries: self
                .entries
                .iter()
                .map(|entry| EntryJson {
                    record: entry.record.clone(),
                    leaf: hex_encode(entry.leaf),
                    leaf_index: entry.leaf_index,
                    proof: match &entry.outcome {
                        ProofOutcome::Proven { proof, .. } => Some(proof.clone()),
                        ProofOutcome::Unprocessable(_) => None,
                    },
                    verified: entry.verified(),
                    error: match &entry.outcome {
                        ProofOutcome::Proven { .. } => None,
                        ProofOutcome::Unprocessable(reason) => Some(reason.clone()),
                    },
                })
                .collect(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root = {}", hex_encode(self.root))?;
        writeln!(f)?;
        for entry in &self.entries {
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJson {
    pub root: String,
    pub entries: Vec<EntryJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryJson {
    pub record: String,
    pub leaf: String,
    pub leaf_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<MerkleProof>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How the report file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file so each run leaves exactly one report.
    #[default]
    Truncate,
    /// Append to whatever earlier runs left behind.
    Append,
}

/// Writes rendered reports to a file.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
    mode: WriteMode,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the text report.
    ///
    /// # Errors
    /// Returns [`AllowlistError::SinkWrite`] if the file cannot be written; the
    /// report itself is left untouched
    pub fn write(&self, report: &Report) -> Result<(), AllowlistError> {
        let contents = report.to_string();
        debug!(
            path = %self.path.display(),
            mode = ?self.mode,
            bytes = contents.len(),
            "writing report"
        );
        self.write_contents(&contents)?;
        info!(path = %self.path.display(), entries = report.entries.len(), "report written");
        Ok(())
    }

    /// Writes the report as pretty JSON. Always replaces the file.
    pub fn write_json(path: &Path, report: &Report) -> Result<(), AllowlistError> {
        let json = serde_json::to_string_pretty(&report.to_json())
            .map_err(|e| sink_error(path, e.into()))?;
        write_file_atomic(path, &json).map_err(|e| sink_error(path, std::io::Error::other(e)))
    }

    fn write_contents(&self, contents: &str) -> Result<(), AllowlistError> {
        match self.mode {
            WriteMode::Truncate => write_file_atomic(&self.path, contents)
                .map_err(|e| sink_error(&self.path, std::io::Error::other(e))),
            WriteMode::Append => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| sink_error(&self.path, e))?;
                file.write_all(contents.as_bytes())
                    .and_then(|()| file.flush())
                    .map_err(|e| sink_error(&self.path, e))
            }
        }
    }
}

fn sink_error(path: &Path, source: std::io::Error) -> AllowlistError {
    AllowlistError::SinkWrite {
        path: path.to_path_buf(),
        source,
    }
}
