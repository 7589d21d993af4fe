//! Async front for a [`RecordingSession`]
//!
//! The session lives inside one tokio task and every request reaches it
//! through a bounded channel, so fixes from any number of producers are
//! filtered strictly in arrival order while readers get trail snapshots.

use crate::checkpoint::{Checkpoint, CheckpointDetails, CheckpointStatus};
use crate::error::{TrailError, TrailResult};
use crate::filter::FilterVerdict;
use crate::path::WalkedPath;
use crate::session::{RecordingSession, SessionMetadata};
use crate::types::{RawFix, Trail};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const COMMAND_QUEUE: usize = 100;

type Reply<T> = oneshot::Sender<TrailResult<T>>;

enum Command {
    Start { now_ms: i64, response_tx: Reply<()> },
    Pause { response_tx: Reply<()> },
    Stop { response_tx: Reply<()> },
    Ingest { fix: RawFix, response_tx: Reply<FilterVerdict> },
    Snapshot { response_tx: Reply<Trail> },
    Metadata { response_tx: Reply<SessionMetadata> },
    CurrentPosition { response_tx: Reply<Option<(f64, f64)>> },
    Reconstruct { target: usize, response_tx: Reply<WalkedPath> },
    AddCheckpoint { name: String, details: CheckpointDetails, response_tx: Reply<Checkpoint> },
    SetCheckpointStatus { id: u64, status: CheckpointStatus, response_tx: Reply<Checkpoint> },
    RemoveCheckpoint { id: u64, response_tx: Reply<Checkpoint> },
    RouteToCheckpoint { id: u64, response_tx: Reply<WalkedPath> },
}

/// Cloneable handle to a running tracker task
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<Command>,
}

/// Move `session` into a new task; it is handed back once every handle is dropped
pub fn spawn(session: RecordingSession) -> (TrackerHandle, JoinHandle<RecordingSession>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
    let task = tokio::spawn(run(session, rx));
    (TrackerHandle { tx }, task)
}

async fn run(mut session: RecordingSession, mut rx: mpsc::Receiver<Command>) -> RecordingSession {
    while let Some(cmd) = rx.recv().await {
        // a dropped receiver only means the caller stopped waiting
        match cmd {
            Command::Start { now_ms, response_tx } => {
                let _ = response_tx.send(session.start(now_ms));
            }
            Command::Pause { response_tx } => {
                let _ = response_tx.send(session.pause());
            }
            Command::Stop { response_tx } => {
                let _ = response_tx.send(session.stop());
            }
            Command::Ingest { fix, response_tx } => {
                let _ = response_tx.send(session.ingest(&fix));
            }
            Command::Snapshot { response_tx } => {
                let _ = response_tx.send(Ok(session.snapshot()));
            }
            Command::Metadata { response_tx } => {
                let _ = response_tx.send(Ok(session.metadata().clone()));
            }
            Command::CurrentPosition { response_tx } => {
                let _ = response_tx.send(Ok(session.current_position()));
            }
            Command::Reconstruct { target, response_tx } => {
                let _ = response_tx.send(session.route_to(target));
            }
            Command::AddCheckpoint { name, details, response_tx } => {
                let _ = response_tx.send(session.add_checkpoint(&name, details));
            }
            Command::SetCheckpointStatus { id, status, response_tx } => {
                let _ = response_tx.send(session.set_checkpoint_status(id, status));
            }
            Command::RemoveCheckpoint { id, response_tx } => {
                let _ = response_tx.send(session.remove_checkpoint(id));
            }
            Command::RouteToCheckpoint { id, response_tx } => {
                let _ = response_tx.send(session.route_to_checkpoint(id));
            }
        }
    }
    log::info!("Tracker for {} shutting down", session.metadata().session_id);
    session
}

impl TrackerHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> TrailResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(make(response_tx))
            .await
            .map_err(|_| TrailError::TrackerClosed)?;
        response_rx.await.map_err(|_| TrailError::TrackerClosed)?
    }

    pub async fn start(&self, now_ms: i64) -> TrailResult<()> {
        self.request(|response_tx| Command::Start { now_ms, response_tx }).await
    }

    pub async fn pause(&self) -> TrailResult<()> {
        self.request(|response_tx| Command::Pause { response_tx }).await
    }

    pub async fn stop(&self) -> TrailResult<()> {
        self.request(|response_tx| Command::Stop { response_tx }).await
    }

    pub async fn ingest(&self, fix: RawFix) -> TrailResult<FilterVerdict> {
        self.request(|response_tx| Command::Ingest { fix, response_tx }).await
    }

    pub async fn snapshot(&self) -> TrailResult<Trail> {
        self.request(|response_tx| Command::Snapshot { response_tx }).await
    }

    pub async fn metadata(&self) -> TrailResult<SessionMetadata> {
        self.request(|response_tx| Command::Metadata { response_tx }).await
    }

    pub async fn current_position(&self) -> TrailResult<Option<(f64, f64)>> {
        self.request(|response_tx| Command::CurrentPosition { response_tx }).await
    }

    pub async fn reconstruct(&self, target: usize) -> TrailResult<WalkedPath> {
        self.request(|response_tx| Command::Reconstruct { target, response_tx }).await
    }

    pub async fn add_checkpoint(
        &self,
        name: &str,
        details: CheckpointDetails,
    ) -> TrailResult<Checkpoint> {
        let name = name.to_string();
        self.request(|response_tx| Command::AddCheckpoint { name, details, response_tx })
            .await
    }

    pub async fn set_checkpoint_status(
        &self,
        id: u64,
        status: CheckpointStatus,
    ) -> TrailResult<Checkpoint> {
        self.request(|response_tx| Command::SetCheckpointStatus { id, status, response_tx })
            .await
    }

    pub async fn remove_checkpoint(&self, id: u64) -> TrailResult<Checkpoint> {
        self.request(|response_tx| Command::RemoveCheckpoint { id, response_tx })
            .await
    }

    pub async fn route_to_checkpoint(&self, id: u64) -> TrailResult<WalkedPath> {
        self.request(|response_tx| Command::RouteToCheckpoint { id, response_tx })
            .await
    }
}
