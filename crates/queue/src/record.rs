//! Append-only, length-prefixed record log — the same shape as
//! `gridnode-storage`'s writer, duplicated here rather than shared because
//! the two crates report distinct error types and neither should depend on
//! the other just for this.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use gridnode_types::error::QueueError;

fn to_open_err(e: impl std::fmt::Display) -> QueueError {
    QueueError::Open(e.to_string())
}

pub fn append(path: &Path, bytes: &[u8]) -> Result<(), QueueError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_open_err)?;
    let mut writer = BufWriter::new(file);
    let len = bytes.len() as u64;
    writer.write_all(&len.to_le_bytes()).map_err(to_open_err)?;
    writer.write_all(bytes).map_err(to_open_err)?;
    writer.flush().map_err(to_open_err)?;
    writer.get_ref().sync_data().map_err(to_open_err)?;
    Ok(())
}

/// Reads every complete record in `path`, in append order. A trailing
/// truncated record (the tail of a length header or body with no more
/// bytes behind it) is a decode failure, not silently dropped — the caller
/// purges the whole log on any such error (§4.2).
pub fn read_all(path: &Path) -> Result<Vec<Vec<u8>>, QueueError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(to_open_err)?;
    let mut reader = BufReader::new(file);
    let mut out = Vec::new();
    loop {
        if reader.fill_buf().map_err(to_open_err)?.is_empty() {
            break;
        }
        let mut len_buf = [0u8; 8];
        reader.read_exact(&mut len_buf).map_err(to_open_err)?;
        let len = u64::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).map_err(to_open_err)?;
        out.push(body);
    }
    Ok(out)
}
