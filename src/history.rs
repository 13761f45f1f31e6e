//! Package history log reader
//!
//! The log is written by the package manager, one action per line:
//!
//! ```text
//! 2024-03-01 10:15:02|install|vim|9.1-2.1|x86_64|root@host|update|sha256...|
//! 2024-03-01 10:15:09|remove |nano|7.2-1.1|x86_64|root@host|
//! 2024-03-02 08:00:00|radd   |oss|http://download.example.org/oss|
//! ```
//!
//! Action names are padded to equal width, comment lines start with `#`.
//! The reader is a single forward pass; nothing is kept after an entry has
//! been handed out.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use jiff::civil::DateTime;
use thiserror::Error;
use tracing::debug;

/// Where the package manager writes its history
pub const HISTORY_FILE: &str = "/var/log/zypp/history";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("read error after line {line}: {source}")]
    Read { line: usize, source: std::io::Error },
    #[error("bad history entry at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: DateTime,
    pub record: HistoryRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRecord {
    Install {
        name: String,
        edition: String,
        arch: String,
        requested_by: String,
        repo: String,
    },
    Remove {
        name: String,
        edition: String,
        arch: String,
        requested_by: String,
    },
    RepoAdd {
        alias: String,
        url: String,
    },
    RepoRemove {
        alias: String,
    },
    RepoAliasChange {
        old_alias: String,
        new_alias: String,
    },
    RepoUrlChange {
        alias: String,
        new_url: String,
    },
    Command {
        user: String,
        command: String,
    },
    Patch {
        name: String,
        edition: String,
        arch: String,
        repo: String,
        category: String,
        severity: String,
        state: String,
    },
    /// An action this reader doesn't know
    Other {
        action: String,
    },
}

impl HistoryRecord {
    /// Action name as written in the log
    pub fn action(&self) -> &str {
        match self {
            Self::Install { .. } => "install",
            Self::Remove { .. } => "remove",
            Self::RepoAdd { .. } => "radd",
            Self::RepoRemove { .. } => "rremove",
            Self::RepoAliasChange { .. } => "ralias",
            Self::RepoUrlChange { .. } => "rurl",
            Self::Command { .. } => "command",
            Self::Patch { .. } => "patch",
            Self::Other { action } => action,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Skip malformed lines instead of failing on them
    pub ignore_invalid_items: bool,
}

/// Lazily parses history entries from any line source
pub struct HistoryReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    options: ReaderOptions,
    failed: bool,
}

impl HistoryReader<BufReader<File>> {
    pub fn open(path: &Path, options: ReaderOptions) -> Result<Self, HistoryError> {
        let file = File::open(path).map_err(|source| HistoryError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), options))
    }
}

impl<R: BufRead> HistoryReader<R> {
    pub fn new(reader: R, options: ReaderOptions) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            options,
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for HistoryReader<R> {
    type Item = Result<HistoryEntry, HistoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        // One error ends the pass
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(HistoryError::Read {
                        line: self.line_no,
                        source,
                    }));
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_line(trimmed) {
                Ok(entry) => return Some(Ok(entry)),
                Err(message) if self.options.ignore_invalid_items => {
                    debug!(line = self.line_no, %message, "skipping invalid history entry");
                }
                Err(message) => {
                    self.failed = true;
                    return Some(Err(HistoryError::Parse {
                        line: self.line_no,
                        message,
                    }));
                }
            }
        }
    }
}

/// Parse one non-comment line
pub fn parse_line(line: &str) -> Result<HistoryEntry, String> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < 2 {
        return Err(String::from("missing action field"));
    }

    let date = DateTime::strptime(DATE_FORMAT, fields[0].trim())
        .map_err(|e| format!("bad date '{}': {e}", fields[0]))?;
    let action = fields[1].trim();
    let args = &fields[2..];

    let need = |count: usize| -> Result<(), String> {
        if args.len() < count {
            Err(format!("'{action}' needs {count} fields, got {}", args.len()))
        } else {
            Ok(())
        }
    };
    let field = |idx: usize| args.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();

    let record = match action {
        "install" => {
            need(3)?;
            HistoryRecord::Install {
                name: field(0),
                edition: field(1),
                arch: field(2),
                requested_by: field(3),
                repo: field(4),
            }
        }
        "remove" => {
            need(3)?;
            HistoryRecord::Remove {
                name: field(0),
                edition: field(1),
                arch: field(2),
                requested_by: field(3),
            }
        }
        "radd" => {
            need(2)?;
            HistoryRecord::RepoAdd {
                alias: field(0),
                url: field(1),
            }
        }
        "rremove" => {
            need(1)?;
            HistoryRecord::RepoRemove { alias: field(0) }
        }
        "ralias" => {
            need(2)?;
            HistoryRecord::RepoAliasChange {
                old_alias: field(0),
                new_alias: field(1),
            }
        }
        "rurl" => {
            need(2)?;
            HistoryRecord::RepoUrlChange {
                alias: field(0),
                new_url: field(1),
            }
        }
        "command" => {
            need(2)?;
            HistoryRecord::Command {
                user: field(0),
                command: field(1),
            }
        }
        "patch" => {
            need(3)?;
            HistoryRecord::Patch {
                name: field(0),
                edition: field(1),
                arch: field(2),
                repo: field(3),
                category: field(4),
                severity: field(5),
                state: field(6),
            }
        }
        "" => return Err(String::from("empty action")),
        other => HistoryRecord::Other {
            action: other.to_string(),
        },
    };

    Ok(HistoryEntry { date, record })
}
