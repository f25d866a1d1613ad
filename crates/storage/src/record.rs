//! A small append-only, length-prefixed record log, in the spirit of the
//! teacher's `storage::wal` writer: append, flush, and `sync_data` before
//! returning, so a crash after a successful append never loses the record.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use gridnode_types::StorageError;

fn to_backend_err(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{context}: {e}"))
}

/// Appends one length-prefixed record to `path`, creating the file if it
/// does not exist. Durable: flushes and fsyncs before returning.
pub fn append(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| to_backend_err("open append log", e))?;
    let mut writer = BufWriter::new(file);
    let len = bytes.len() as u64;
    writer
        .write_all(&len.to_le_bytes())
        .map_err(|e| to_backend_err("write record header", e))?;
    writer
        .write_all(bytes)
        .map_err(|e| to_backend_err("write record body", e))?;
    writer.flush().map_err(|e| to_backend_err("flush record log", e))?;
    writer
        .get_ref()
        .sync_data()
        .map_err(|e| to_backend_err("fsync record log", e))?;
    Ok(())
}

/// Reads every record in `path` in append order. Returns an empty vector if
/// the file does not exist yet.
pub fn read_all(path: &Path) -> Result<Vec<Vec<u8>>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|e| to_backend_err("open record log", e))?;
    let mut reader = BufReader::new(file);
    let mut out = Vec::new();
    loop {
        if reader
            .fill_buf()
            .map_err(|e| to_backend_err("read record log", e))?
            .is_empty()
        {
            break;
        }
        let mut len_buf = [0u8; 8];
        reader
            .read_exact(&mut len_buf)
            .map_err(|e| to_backend_err("read record header", e))?;
        let len = u64::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        reader
            .read_exact(&mut body)
            .map_err(|e| to_backend_err("read record body", e))?;
        out.push(body);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_are_read_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.bin");
        append(&path, b"one").unwrap();
        append(&path, b"two").unwrap();
        append(&path, b"three").unwrap();
        let all = read_all(&path).unwrap();
        assert_eq!(all, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(read_all(&path).unwrap().is_empty());
    }
}
