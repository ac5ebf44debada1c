//! Append-only JSON-lines log of completed domain harvests.
//!
//! Each completed domain is written as one line and flushed immediately, so a
//! run that is killed mid-batch can be resumed without re-fetching domains
//! it already finished. A torn trailing line is skipped on replay.

use crate::core::error::Result;
use crate::utils::domain::Domain;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    domain: Domain,
    emails: BTreeSet<String>,
}

pub struct HarvestJournal {
    writer: BufWriter<File>,
    path: PathBuf,
    replayed: HashMap<Domain, BTreeSet<String>>,
    appended: usize,
}

impl HarvestJournal {
    /// Opens (or creates) the journal at `path`, replaying existing entries.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let replayed = if path.exists() {
            Self::replay(path)?
        } else {
            HashMap::new()
        };
        if !replayed.is_empty() {
            tracing::info!("Journal {} holds {} completed domain(s).", path.display(), replayed.len());
        }

        let torn_tail = path.exists() && !ends_with_newline(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        if torn_tail {
            // new entries must start on a fresh line
            tracing::warn!("Journal {} ends mid-line; starting a new line.", path.display());
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            replayed,
            appended: 0,
        })
    }

    fn replay(path: &Path) -> Result<HashMap<Domain, BTreeSet<String>>> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = HashMap::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(&line) {
                // first write wins, matching HarvestResult
                Ok(entry) => {
                    entries.entry(entry.domain).or_insert(entry.emails);
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable journal line {} in {}: {}", n + 1, path.display(), e);
                }
            }
        }
        Ok(entries)
    }

    /// Results recovered from a previous run.
    pub fn replayed(&self) -> &HashMap<Domain, BTreeSet<String>> {
        &self.replayed
    }

    /// Appends one completed domain and flushes it to disk.
    pub fn append(&mut self, domain: &Domain, emails: &BTreeSet<String>) -> Result<()> {
        let entry = JournalEntry {
            domain: domain.clone(),
            emails: emails.clone(),
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.appended += 1;
        Ok(())
    }

    /// Entries written by this process.
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
