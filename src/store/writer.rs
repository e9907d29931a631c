//! Single-writer task for the detection log
//!
//! Classification completions arrive on many tasks at once, but the log
//! append is a read-modify-write of one file. All appends are queued to a
//! single task that performs them one at a time, so no completion can
//! overwrite another's record.
//!
//! ```text
//!   [classify task] ──┐
//!   [classify task] ──┼──► mpsc ──► DetectionLogWriter ──► detection.json
//!   [classify task] ──┘                 │
//!          ▲                            │
//!          └────────── oneshot ack ─────┘
//! ```

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::log::DetectionLog;
use super::record::DetectionRecord;

/// Default depth of the append queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

const WRITER_NAME: &str = "detection log writer";

struct AppendRequest {
    record: DetectionRecord,
    ack: oneshot::Sender<Result<usize>>,
}

/// Task owning the detection log file
pub struct DetectionLogWriter {
    log: DetectionLog,
    rx: mpsc::Receiver<AppendRequest>,
}

impl DetectionLogWriter {
    /// Start the writer task
    ///
    /// The task exits once every handle has been dropped and the queue has
    /// drained.
    pub fn spawn(log: DetectionLog, capacity: usize) -> (DetectionLogHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = Self { log, rx };
        let task = tokio::spawn(writer.run());

        (DetectionLogHandle { tx }, task)
    }

    async fn run(mut self) {
        tracing::debug!(path = %self.log.path().display(), "Detection log writer started");

        while let Some(request) = self.rx.recv().await {
            let result = self.log.append(request.record).await;
            // The requester may have gone away; the record is written regardless
            let _ = request.ack.send(result);
        }

        tracing::debug!(path = %self.log.path().display(), "Detection log writer stopped");
    }
}

/// Cloneable handle for queueing appends
#[derive(Clone)]
pub struct DetectionLogHandle {
    tx: mpsc::Sender<AppendRequest>,
}

impl DetectionLogHandle {
    /// Append a record and wait until it has been written
    ///
    /// Returns the record count after the append.
    pub async fn append(&self, record: DetectionRecord) -> Result<usize> {
        let (ack, done) = oneshot::channel();

        self.tx
            .send(AppendRequest { record, ack })
            .await
            .map_err(|_| Error::ChannelClosed(WRITER_NAME))?;

        done.await.map_err(|_| Error::ChannelClosed(WRITER_NAME))?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn test_append_through_writer() {
        let dir = tempfile::tempdir().unwrap();
        let log = DetectionLog::new(dir.path().join("detection.json"));
        let (handle, task) = DetectionLogWriter::spawn(log.clone(), 16);

        let count = handle
            .append(DetectionRecord::now("f1", Some("bottle".into())))
            .await
            .unwrap();
        assert_eq!(count, 1);

        drop(handle);
        task.await.unwrap();

        assert_eq!(log.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let log = DetectionLog::new(dir.path().join("detection.json"));

        for i in 0..3 {
            log.append(DetectionRecord::now(format!("old-{}", i), None))
                .await
                .unwrap();
        }

        let (handle, task) = DetectionLogWriter::spawn(log.clone(), 4);

        let appends: Vec<_> = (0..50)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    let detection = (i % 2 == 0).then(|| "bottle".to_string());
                    handle
                        .append(DetectionRecord::now(format!("new-{}", i), detection))
                        .await
                })
            })
            .collect();

        for append in appends {
            append.await.unwrap().unwrap();
        }
        drop(handle);
        task.await.unwrap();

        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 53);

        let ids: HashSet<String> = records.into_iter().map(|r| r.id).collect();
        for i in 0..50 {
            assert!(ids.contains(&format!("new-{}", i)), "lost record new-{}", i);
        }
        for i in 0..3 {
            assert!(ids.contains(&format!("old-{}", i)));
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("static");
        std::fs::write(&blocker, b"file").unwrap();

        let (handle, _task) =
            DetectionLogWriter::spawn(DetectionLog::new(blocker.join("detection.json")), 4);

        let err = handle
            .append(DetectionRecord::now("f1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        // The writer keeps serving after a failed append
        let err = handle
            .append(DetectionRecord::now("f2", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_closed_writer() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) =
            DetectionLogWriter::spawn(DetectionLog::new(dir.path().join("detection.json")), 4);

        task.abort();
        let _ = task.await;

        let err = handle
            .append(DetectionRecord::now("f1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelClosed(_)));
    }
}
