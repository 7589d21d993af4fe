//! Survey trail recording
//!
//! Filters a stream of raw position fixes into a clean walked trail and
//! reconstructs the actual walked route back to any point on it.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod geodesy;
pub mod path;
pub mod session;
pub mod smoothing;
pub mod stationary;
pub mod tracker;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointDetails, CheckpointStatus, SignalStrength};
pub use config::{FilterConfig, PathConfig, TrailConfig};
pub use error::{TrailError, TrailResult};
pub use filter::{ingest, FilterState, FilterVerdict, RejectReason, VerdictCounts};
pub use path::{reconstruct, PathReconstructor, PathSource, WalkedPath};
pub use session::{RecordingSession, SessionState};
pub use types::{AcceptedPoint, RawFix, Trail};
