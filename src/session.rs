use crate::config::TrailConfig;
use crate::error::{TrailError, TrailResult};
use crate::filter::{self, FilterState, FilterVerdict, VerdictCounts};
use crate::path::{PathReconstructor, WalkedPath};
use crate::types::{RawFix, Trail};
use serde::{Deserialize, Serialize};

pub use crate::checkpoint::{Checkpoint, CheckpointDetails, CheckpointStatus, SignalStrength};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No recording in progress; the previous trail stays readable
    Idle,
    /// Fixes are being filtered into the trail
    Recording,
    /// Recording suspended, filter history kept
    Paused,
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub started_at_ms: Option<i64>,
    pub state: SessionState,
    pub fixes_received: u64,
    pub verdicts: VerdictCounts,
    pub distance_meters: f64,
}

/// One recording session: filter state, trail and checkpoints
///
/// Owned by a single task; `ingest` takes `&mut self`, so fixes are
/// processed strictly one at a time.
pub struct RecordingSession {
    config: TrailConfig,
    metadata: SessionMetadata,
    filter: FilterState,
    trail: Trail,
    checkpoints: Vec<Checkpoint>,
    next_checkpoint_id: u64,
    reconstructor: PathReconstructor,
}

impl RecordingSession {
    /// Create new session in Idle state
    pub fn new(config: TrailConfig) -> TrailResult<Self> {
        config.validate()?;
        let filter = FilterState::new(&config.filter, 0);
        let reconstructor = PathReconstructor::new(config.path.clone());

        Ok(RecordingSession {
            config,
            metadata: SessionMetadata {
                session_id: String::new(),
                started_at_ms: None,
                state: SessionState::Idle,
                fixes_received: 0,
                verdicts: VerdictCounts::default(),
                distance_meters: 0.0,
            },
            filter,
            trail: Trail::new(),
            checkpoints: Vec::new(),
            next_checkpoint_id: 1,
            reconstructor,
        })
    }

    /// Rebuild an Idle session around a previously recorded trail
    pub fn restore(
        config: TrailConfig,
        session_id: String,
        trail: Trail,
        checkpoints: Vec<Checkpoint>,
    ) -> TrailResult<Self> {
        let mut session = Self::new(config)?;
        if let Some(bad) = checkpoints.iter().find(|cp| cp.track_index >= trail.len()) {
            return Err(TrailError::TargetOutOfRange {
                target: bad.track_index,
                len: trail.len(),
            });
        }
        session.metadata.session_id = session_id;
        session.metadata.started_at_ms = trail.first().map(|p| p.timestamp);
        session.metadata.distance_meters = trail.total_distance();
        session.next_checkpoint_id = checkpoints.iter().map(|cp| cp.id).max().unwrap_or(0) + 1;
        session.trail = trail;
        session.checkpoints = checkpoints;
        Ok(session)
    }

    /// Idle → Recording starts a fresh trail; Paused → Recording resumes
    pub fn start(&mut self, now_ms: i64) -> TrailResult<()> {
        match self.metadata.state {
            SessionState::Idle => {
                self.filter = FilterState::new(&self.config.filter, now_ms);
                self.trail.clear();
                self.checkpoints.clear();
                self.next_checkpoint_id = 1;
                self.metadata = SessionMetadata {
                    session_id: format!("session_{}", now_ms),
                    started_at_ms: Some(now_ms),
                    state: SessionState::Recording,
                    fixes_received: 0,
                    verdicts: VerdictCounts::default(),
                    distance_meters: 0.0,
                };
                log::info!("Started {}", self.metadata.session_id);
                Ok(())
            }
            SessionState::Recording => Err(TrailError::AlreadyRecording),
            SessionState::Paused => {
                self.metadata.state = SessionState::Recording;
                log::info!("Resumed {}", self.metadata.session_id);
                Ok(())
            }
        }
    }

    /// Recording → Paused
    pub fn pause(&mut self) -> TrailResult<()> {
        match self.metadata.state {
            SessionState::Recording => {
                self.metadata.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Paused => Err(TrailError::InvalidState("Already paused".to_string())),
            SessionState::Idle => Err(TrailError::NotRecording),
        }
    }

    /// Recording/Paused → Idle; the trail stays readable until the next start
    pub fn stop(&mut self) -> TrailResult<()> {
        match self.metadata.state {
            SessionState::Recording | SessionState::Paused => {
                self.metadata.state = SessionState::Idle;
                log::info!(
                    "Stopped {}: {} points, {:.0}m",
                    self.metadata.session_id,
                    self.trail.len(),
                    self.metadata.distance_meters
                );
                Ok(())
            }
            SessionState::Idle => Err(TrailError::NotRecording),
        }
    }

    pub fn state(&self) -> SessionState {
        self.metadata.state
    }

    pub fn is_recording(&self) -> bool {
        self.metadata.state == SessionState::Recording
    }

    /// Filter one fix into the trail
    pub fn ingest(&mut self, fix: &RawFix) -> TrailResult<FilterVerdict> {
        if !self.is_recording() {
            return Err(TrailError::NotRecording);
        }

        let previous = self.trail.last().copied();
        let verdict = filter::ingest(&mut self.filter, &mut self.trail, &self.config.filter, fix);

        self.metadata.fixes_received += 1;
        self.metadata.verdicts.record(&verdict);
        if let (FilterVerdict::Accepted(point), Some(prev)) = (verdict, previous) {
            self.metadata.distance_meters +=
                crate::geodesy::distance(prev.position(), point.position());
        }
        Ok(verdict)
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Consistent copy of the trail for readers outside the session owner
    pub fn snapshot(&self) -> Trail {
        self.trail.clone()
    }

    /// Smoothed live position, tracked even while fixes are rejected
    pub fn current_position(&self) -> Option<(f64, f64)> {
        self.filter.current_position()
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn checkpoint(&self, id: u64) -> TrailResult<&Checkpoint> {
        self.checkpoints
            .iter()
            .find(|cp| cp.id == id)
            .ok_or(TrailError::UnknownCheckpoint(id))
    }

    /// Mark a checkpoint at the current end of the trail
    pub fn add_checkpoint(
        &mut self,
        name: &str,
        details: CheckpointDetails,
    ) -> TrailResult<Checkpoint> {
        if self.metadata.state == SessionState::Idle {
            return Err(TrailError::NotRecording);
        }
        let last = self.trail.last().copied().ok_or(TrailError::EmptyTrail)?;

        let checkpoint = Checkpoint {
            id: self.next_checkpoint_id,
            name: name.trim().to_string(),
            status: CheckpointStatus::Active,
            details,
            track_index: self.trail.len() - 1,
            lat: last.lat,
            lon: last.lon,
            distance_from_start: self.metadata.distance_meters,
            timestamp: last.timestamp,
        };
        self.next_checkpoint_id += 1;
        self.checkpoints.push(checkpoint.clone());
        log::info!(
            "Checkpoint {} '{}' at trail index {}",
            checkpoint.id,
            checkpoint.name,
            checkpoint.track_index
        );
        Ok(checkpoint)
    }

    /// Move a checkpoint through its field lifecycle
    pub fn set_checkpoint_status(
        &mut self,
        id: u64,
        status: CheckpointStatus,
    ) -> TrailResult<Checkpoint> {
        let checkpoint = self
            .checkpoints
            .iter_mut()
            .find(|cp| cp.id == id)
            .ok_or(TrailError::UnknownCheckpoint(id))?;
        if !checkpoint.status.can_transition_to(status) {
            return Err(TrailError::InvalidState(format!(
                "Checkpoint {} cannot go from {} to {}",
                id, checkpoint.status, status
            )));
        }
        checkpoint.status = status;
        log::info!("Checkpoint {} is now {}", id, status);
        Ok(checkpoint.clone())
    }

    pub fn remove_checkpoint(&mut self, id: u64) -> TrailResult<Checkpoint> {
        let pos = self
            .checkpoints
            .iter()
            .position(|cp| cp.id == id)
            .ok_or(TrailError::UnknownCheckpoint(id))?;
        Ok(self.checkpoints.remove(pos))
    }

    /// Walked route from the trail start to `target`
    pub fn route_to(&self, target: usize) -> TrailResult<WalkedPath> {
        self.reconstructor.reconstruct(&self.trail, target)
    }

    /// Walked route from the trail start to a checkpoint
    pub fn route_to_checkpoint(&self, id: u64) -> TrailResult<WalkedPath> {
        let track_index = self.checkpoint(id)?.track_index;
        self.route_to(track_index)
    }
}
