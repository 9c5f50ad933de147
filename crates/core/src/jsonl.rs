// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Provides durable append-only storage for JSON-serializable records.
//! Each record is stored as a single JSON line with fsync for durability.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Appends a record to a JSONL file with fsync for durability.
///
/// A torn line left at the end of the file by an earlier failed write is cut
/// off first, and a write that fails part-way is truncated back, so the next
/// append always starts on a fresh line. Returns the file length after the
/// write.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<u64> {
    let line = format!("{}\n", serde_json::to_string(record)?);
    let mut file =
        OpenOptions::new().create(true).read(true).write(true).truncate(false).open(path)?;

    let start = clean_len(&mut file, path)?;
    file.seek(SeekFrom::Start(start))?;
    if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.sync_all()) {
        if let Err(undo) = file.set_len(start) {
            tracing::warn!(path = %path.display(), "could not undo partial append: {}", undo);
        }
        return Err(e.into());
    }

    Ok(start + line.len() as u64)
}

/// Length of the file up to and including its last newline, dropping any
/// torn tail past it.
fn clean_len(file: &mut File, path: &Path) -> Result<u64> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    file.seek(SeekFrom::Start(0))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    let keep = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i as u64 + 1);
    tracing::warn!(path = %path.display(), dropped = len - keep, "truncating torn journal tail");
    file.set_len(keep)?;
    Ok(keep)
}

/// Reads the complete lines written after byte `offset`.
///
/// Returns the records and the offset just past the last complete line. A
/// trailing line still missing its newline is left for a later call.
pub fn read_from<T: DeserializeOwned>(path: &Path, offset: u64) -> Result<(Vec<T>, u64)> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), offset)),
        Err(e) => return Err(e.into()),
    };
    file.seek(SeekFrom::Start(offset))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    let Some(end) = tail.iter().rposition(|b| *b == b'\n') else {
        return Ok((Vec::new(), offset));
    };
    let complete = std::str::from_utf8(&tail[..end])
        .map_err(|e| Error::CorruptedJournal { line: 0, reason: e.to_string() })?;

    let mut records = Vec::new();
    for (idx, line) in complete.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .map_err(|e| Error::CorruptedJournal { line: idx + 1, reason: e.to_string() })?;
        records.push(record);
    }

    Ok((records, offset + end as u64 + 1))
}

/// Current length of the file, zero if it does not exist.
pub fn file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        )
        .into()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Reads all records from a JSONL file.
///
/// Skips empty lines and returns an empty vec if the file doesn't exist.
/// A final line without its newline that fails to parse is a write torn by a
/// crash; it is dropped. Any other unparseable line is an error.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut content = String::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_string(&mut content)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    }

    let complete = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let mut records = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) if !complete && idx + 1 == lines.len() => {
                tracing::warn!(path = %path.display(), "dropping torn trailing line: {}", e);
            }
            Err(e) => {
                return Err(Error::CorruptedJournal { line: idx + 1, reason: e.to_string() });
            }
        }
    }

    Ok(records)
}

/// Returns false if the file's last line lacks its newline (a torn append).
///
/// Missing and empty files end cleanly.
pub fn ends_cleanly(path: &Path) -> Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Writes all records to a JSONL file, replacing existing content.
///
/// The new content goes to a sibling temp file which is fsynced and renamed
/// over `path`, so readers see either the old file or the new one.
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = temp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Persist the rename itself. Not supported everywhere.
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
