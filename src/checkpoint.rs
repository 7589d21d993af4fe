use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Field status of a marked target
///
/// Allowed moves: Active → Dug | Ignored, Dug | Ignored → Recheck,
/// Recheck → Dug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointStatus {
    #[default]
    Active,
    Dug,
    Ignored,
    Recheck,
}

impl CheckpointStatus {
    pub fn can_transition_to(self, next: CheckpointStatus) -> bool {
        use CheckpointStatus::*;
        matches!(
            (self, next),
            (Active, Dug) | (Active, Ignored) | (Dug, Recheck) | (Ignored, Recheck) | (Recheck, Dug)
        )
    }

    /// Still worth walking back to
    pub fn is_open(self) -> bool {
        matches!(self, CheckpointStatus::Active | CheckpointStatus::Recheck)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStatus::Active => "ACTIVE",
            CheckpointStatus::Dug => "DUG",
            CheckpointStatus::Ignored => "IGNORED",
            CheckpointStatus::Recheck => "RECHECK",
        }
    }
}

impl Display for CheckpointStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector signal strength reported for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalStrength {
    Weak,
    #[default]
    Medium,
    Strong,
    VeryStrong,
}

impl SignalStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::Weak => "weak",
            SignalStrength::Medium => "medium",
            SignalStrength::Strong => "strong",
            SignalStrength::VeryStrong => "very-strong",
        }
    }
}

/// Optional detector readings supplied when a checkpoint is marked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointDetails {
    pub notes: Option<String>,
    pub signal_strength: SignalStrength,
    pub depth_cm: Option<f64>,
    /// Target ID range shown by the detector, free text
    pub id_range: Option<String>,
}

impl CheckpointDetails {
    pub fn with_notes(notes: impl Into<String>) -> Self {
        CheckpointDetails {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }
}

/// A named point of interest pinned to the end of the trail when it was marked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: CheckpointStatus,
    #[serde(flatten)]
    pub details: CheckpointDetails,
    /// Index into the trail, used for walked-path navigation back to it
    pub track_index: usize,
    pub lat: f64,
    pub lon: f64,
    pub distance_from_start: f64,
    pub timestamp: i64,
}

impl Checkpoint {
    /// One-line summary of the detector readings, used for GPX `<desc>`
    pub fn describe(&self) -> String {
        let mut parts = vec![
            format!("status: {}", self.status),
            format!("signal: {}", self.details.signal_strength.as_str()),
        ];
        if let Some(depth) = self.details.depth_cm {
            parts.push(format!("depth: {}cm", depth));
        }
        if let Some(range) = &self.details.id_range {
            parts.push(format!("id: {}", range));
        }
        if let Some(notes) = &self.details.notes {
            parts.push(notes.clone());
        }
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CheckpointStatus::*;

    #[test]
    fn test_status_transitions() {
        assert!(Active.can_transition_to(Dug));
        assert!(Active.can_transition_to(Ignored));
        assert!(Dug.can_transition_to(Recheck));
        assert!(Ignored.can_transition_to(Recheck));
        assert!(Recheck.can_transition_to(Dug));

        assert!(!Active.can_transition_to(Recheck));
        assert!(!Dug.can_transition_to(Active));
        assert!(!Dug.can_transition_to(Ignored));
        assert!(!Recheck.can_transition_to(Ignored));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_open_statuses() {
        assert!(Active.is_open());
        assert!(Recheck.is_open());
        assert!(!Dug.is_open());
        assert!(!Ignored.is_open());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Recheck).unwrap(), "\"RECHECK\"");
        assert_eq!(
            serde_json::to_string(&SignalStrength::VeryStrong).unwrap(),
            "\"very-strong\""
        );
    }

    #[test]
    fn test_old_records_get_defaults() {
        let json = r#"{
            "id": 3, "name": "coin", "track_index": 0,
            "lat": 44.0, "lon": 17.0, "distance_from_start": 0.0, "timestamp": 1000
        }"#;
        let cp: Checkpoint = serde_json::from_str(json).unwrap();
        assert_eq!(cp.status, Active);
        assert_eq!(cp.details, CheckpointDetails::default());
        assert_eq!(cp.details.signal_strength, SignalStrength::Medium);
    }

    #[test]
    fn test_describe() {
        let cp = Checkpoint {
            id: 1,
            name: "x".into(),
            status: Dug,
            details: CheckpointDetails {
                notes: Some("iron".into()),
                signal_strength: SignalStrength::Strong,
                depth_cm: Some(20.0),
                id_range: Some("40-45".into()),
            },
            track_index: 0,
            lat: 0.0,
            lon: 0.0,
            distance_from_start: 0.0,
            timestamp: 0,
        };
        assert_eq!(
            cp.describe(),
            "status: DUG; signal: strong; depth: 20cm; id: 40-45; iron"
        );
    }
}
