//! # JSON Lines Sink
//!
//! File-backed document store: one JSON object per line. Writes run on a
//! spawned tokio task and are serialized so lines never interleave.
//!
//! Writes still running when the tokio runtime shuts down are lost, so
//! owners await [`RecordSink::flush`] before letting the runtime go.

use crate::domain::errors::PersistError;
use crate::domain::record::Record;
use crate::ports::outbound::RecordSink;
use async_trait::async_trait;
use relay_bus::{deferred, Deferred};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Count of spawned writes that have not finished.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by a write task; releases its slot when the task ends or is dropped.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct JsonLinesSink {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
    in_flight: Arc<InFlight>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes handed off by `save` that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    fn save(&self, record: Record) -> Result<Deferred<Record, PersistError>, PersistError> {
        let handle = Handle::try_current()
            .map_err(|e| PersistError::Unavailable(format!("no async runtime: {e}")))?;
        let line =
            serde_json::to_string(&record).map_err(|e| PersistError::Write(e.to_string()))?;

        let (completer, pending) = deferred();
        let path = self.path.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let slot = InFlightGuard::enter(&self.in_flight);

        handle.spawn(async move {
            let _slot = slot;
            let _guard = write_lock.lock().await;
            match append_line(&path, &line).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Record appended");
                    completer.succeed(record);
                }
                Err(e) => completer.fail(PersistError::Write(e.to_string())),
            }
        });

        Ok(pending)
    }

    async fn flush(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            let remaining = self.in_flight();
            if remaining == 0 {
                return;
            }
            debug!(remaining, "Waiting for pending writes");
            idle.await;
        }
    }
}
