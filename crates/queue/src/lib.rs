//! A durable, single-process FIFO of [`Job`] records (§4.2).
//!
//! Modeled as a write-ahead log: instead of a compacted state snapshot, the
//! queue keeps the full append log around and tracks how much of it has
//! been consumed with a small separate cursor file. A job only leaves the log's
//! logical "pending" region once `dequeue` commits the cursor past it, so a
//! crash between a handler's side effects and the matching `dequeue` call
//! always replays that job on the next boot — the at-least-once delivery
//! the engine is built to tolerate (§4.2).

mod record;

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use gridnode_types::job::Job;
use gridnode_types::error::QueueError;
use parity_scale_codec::{Decode, Encode};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// On-disk envelope for a queued job. A wrapping enum, rather than encoding
/// `Job` directly, gives future schema changes a variant to add without
/// disturbing how `V1` records already on disk decode.
#[derive(Encode, Decode)]
enum StoredJob {
    V1(Job),
}

/// Durable FIFO over `Job` records (§4.2).
#[async_trait]
pub trait Queue: Send + Sync {
    /// Durably appends `job`. Returns only after the record is persisted.
    async fn enqueue(&self, job: Job) -> Result<(), QueueError>;

    /// Blocks until a head record is available, then returns a clone of it
    /// without removing it. Calling this again before `dequeue` returns the
    /// same record.
    async fn peek_block(&self) -> Result<Job, QueueError>;

    /// Removes the current head. Must follow a successful `peek_block`;
    /// returns `QueueError::NothingPeeked` otherwise.
    async fn dequeue(&self) -> Result<(), QueueError>;

    /// Flushes and releases resources. Idempotent.
    async fn close(&self) -> Result<(), QueueError>;
}

struct QueueState {
    pending: VecDeque<Job>,
    peeked: Option<Job>,
    dequeued_count: u64,
}

/// A file-backed `Queue`. `root/jobs.log` holds every job ever enqueued, in
/// append order; `root/cursor.bin` holds the count of records already
/// dequeued from the front.
pub struct FileQueue {
    log_path: PathBuf,
    cursor_path: PathBuf,
    state: StdMutex<QueueState>,
    notify: Notify,
}

impl FileQueue {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| QueueError::Open(e.to_string()))?;
        let log_path = root.join("jobs.log");
        let cursor_path = root.join("cursor.bin");

        let cursor = read_cursor(&cursor_path)?;
        let loaded = load_records(&log_path);

        let (dequeued_count, pending) = match loaded {
            Ok(records) => {
                let skip = cursor.min(records.len() as u64) as usize;
                let pending = records.into_iter().skip(skip).collect();
                (cursor, pending)
            }
            Err(e) => {
                warn!(error = %e, "queue log failed to decode on open, purging and starting fresh");
                let _ = fs::remove_file(&log_path);
                let _ = fs::remove_file(&cursor_path);
                (0, VecDeque::new())
            }
        };

        Ok(Self {
            log_path,
            cursor_path,
            state: StdMutex::new(QueueState {
                pending,
                peeked: None,
                dequeued_count,
            }),
            notify: Notify::new(),
        })
    }

    fn write_cursor(&self, count: u64) -> Result<(), QueueError> {
        let tmp = self.cursor_path.with_extension("bin.tmp");
        fs::write(&tmp, count.to_le_bytes()).map_err(|e| QueueError::Open(e.to_string()))?;
        fs::rename(&tmp, &self.cursor_path).map_err(|e| QueueError::Open(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Queue for FileQueue {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let bytes = StoredJob::V1(job.clone()).encode();
        record::append(&self.log_path, &bytes)?;
        {
            let mut state = self.state.lock().unwrap();
            state.pending.push_back(job);
        }
        debug!("job enqueued");
        self.notify.notify_one();
        Ok(())
    }

    async fn peek_block(&self) -> Result<Job, QueueError> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if let Some(job) = &state.peeked {
                    return Ok(job.clone());
                }
                if let Some(job) = state.pending.pop_front() {
                    state.peeked = Some(job.clone());
                    return Ok(job);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn dequeue(&self) -> Result<(), QueueError> {
        let next_count = {
            let mut state = self.state.lock().unwrap();
            if state.peeked.take().is_none() {
                return Err(QueueError::NothingPeeked);
            }
            state.dequeued_count += 1;
            state.dequeued_count
        };
        self.write_cursor(next_count)
    }

    async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

fn read_cursor(path: &Path) -> Result<u64, QueueError> {
    if !path.exists() {
        return Ok(0);
    }
    let bytes = fs::read(path).map_err(|e| QueueError::Open(e.to_string()))?;
    if bytes.len() != 8 {
        return Ok(0);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes);
    Ok(u64::from_le_bytes(buf))
}

fn load_records(path: &Path) -> Result<Vec<Job>, QueueError> {
    let raw = record::read_all(path)?;
    raw.iter()
        .map(|b| match StoredJob::decode(&mut &b[..]) {
            Ok(StoredJob::V1(job)) => Ok(job),
            Err(e) => Err(QueueError::Codec(e.to_string())),
        })
        .collect()
}
