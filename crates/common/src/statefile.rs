// On-disk snapshot tables: one file per host in a shared state directory.
//
// Format, one repository per line, tab-separated:
//
//     <path>\t<commits>\t<head>\t<hash>\t(clean|dirty)\n
//
// Writers replace the whole file; readers on other hosts may observe a file
// mid-replace, so writes go through a temp file and rename. Malformed lines
// are a hard error: a half-written table must not be silently truncated.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::state::StateRecord;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("unable to access state file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: expected 5 fields, found {found}", .path.display())]
    FieldCount { path: PathBuf, line: usize, found: usize },

    #[error("{}:{line}: invalid commit count {value:?}", .path.display())]
    CommitCount { path: PathBuf, line: usize, value: String },
}

/// Write `records` as the state table for `host`, atomically.
///
/// The table is written to a temp file in the same directory and renamed
/// over `<dir>/<host>`, so concurrent readers see either the old table or
/// the new one, never a partial write.
pub fn write(dir: &Path, host: &str, records: &[StateRecord]) -> Result<(), StateFileError> {
    let io = |source| StateFileError::Io { path: dir.join(host), source };

    fs::create_dir_all(dir).map_err(io)?;

    let mut contents = String::new();
    for record in records {
        let flag = if record.clean { "clean" } else { "dirty" };
        contents.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            record.path, record.commits, record.head, record.hash, flag
        ));
    }

    let tmp = dir.join(format!(".{host}.tmp"));
    fs::write(&tmp, contents).map_err(io)?;
    fs::rename(&tmp, dir.join(host)).map_err(io)
}

/// Read the state table for `host` from `dir`.
///
/// Any malformed line (wrong field count, non-numeric commit count) is a
/// fatal parse fault; bad lines are never skipped.
pub fn read(dir: &Path, host: &str) -> Result<Vec<StateRecord>, StateFileError> {
    let path = dir.join(host);
    let contents =
        fs::read_to_string(&path).map_err(|source| StateFileError::Io { path: path.clone(), source })?;

    let mut records = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(StateFileError::FieldCount {
                path,
                line: index + 1,
                found: fields.len(),
            });
        }

        let commits = fields[1].parse::<u64>().map_err(|_| StateFileError::CommitCount {
            path: path.clone(),
            line: index + 1,
            value: fields[1].to_string(),
        })?;

        records.push(StateRecord {
            path: fields[0].to_string(),
            commits,
            head: fields[2].to_string(),
            hash: fields[3].to_string(),
            clean: fields[4] == "clean",
        });
    }

    Ok(records)
}

/// Enumerate host names with a state table under `dir`, sorted.
///
/// Each file name directly under the directory is a host identifier. Sorted
/// output keeps downstream peer iteration deterministic.
pub fn list_hosts(dir: &Path) -> Result<Vec<String>, StateFileError> {
    let entries =
        fs::read_dir(dir).map_err(|source| StateFileError::Io { path: dir.to_path_buf(), source })?;

    let mut hosts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StateFileError::Io { path: dir.to_path_buf(), source })?;
        if entry.path().is_file() {
            if let Some(name) = entry.file_name().to_str() {
                // Skip in-flight temp files from concurrent writers.
                if !name.starts_with('.') {
                    hosts.push(name.to_string());
                }
            }
        }
    }

    hosts.sort();
    Ok(hosts)
}
