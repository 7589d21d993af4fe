use crate::config::TrailConfig;
use crate::error::{TrailError, TrailResult};
use crate::checkpoint::Checkpoint;
use crate::session::RecordingSession;
use crate::types::{AcceptedPoint, Trail};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Current export format version
pub const EXPORT_VERSION: u32 = 1;

/// Geographic bounds of an exported trail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl TrailBounds {
    pub fn of(trail: &Trail) -> Option<Self> {
        trail.bounds().map(|rect| TrailBounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        })
    }
}

/// Complete session export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: u32,
    pub exported_at: String,
    pub session_id: String,
    pub track_points: Vec<AcceptedPoint>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    pub total_distance_meters: f64,
    #[serde(default)]
    pub bounds: Option<TrailBounds>,
}

impl SessionExport {
    pub fn from_session(session: &RecordingSession) -> Self {
        let trail = session.trail();
        SessionExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            session_id: session.metadata().session_id.clone(),
            track_points: trail.points().to_vec(),
            checkpoints: session.checkpoints().to_vec(),
            total_distance_meters: trail.total_distance(),
            bounds: TrailBounds::of(trail),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> TrailResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, refusing versions newer than this build understands
    pub fn from_json(json: &str) -> TrailResult<Self> {
        let export: SessionExport = serde_json::from_str(json)?;
        if export.version == 0 || export.version > EXPORT_VERSION {
            return Err(TrailError::UnsupportedVersion(export.version));
        }
        Ok(export)
    }

    /// Trail rebuilt from the exported points
    pub fn trail(&self) -> Trail {
        Trail::from_points(self.track_points.iter().copied())
    }

    /// Reopen the exported trail as an Idle session for navigation
    pub fn into_session(self, config: TrailConfig) -> TrailResult<RecordingSession> {
        let trail = self.trail();
        RecordingSession::restore(config, self.session_id, trail, self.checkpoints)
    }

    /// Generate GPX document XML string
    pub fn to_gpx(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"survey_trail\">\n");
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&self.session_id)));
        xml.push_str(&format!("    <time>{}</time>\n", escape_xml(&self.exported_at)));
        if let Some(b) = &self.bounds {
            xml.push_str(&format!(
                "    <bounds minlat=\"{}\" minlon=\"{}\" maxlat=\"{}\" maxlon=\"{}\"/>\n",
                b.min_lat, b.min_lon, b.max_lat, b.max_lon
            ));
        }
        xml.push_str("  </metadata>\n");

        for cp in &self.checkpoints {
            xml.push_str(&format!("  <wpt lat=\"{}\" lon=\"{}\">\n", cp.lat, cp.lon));
            if let Some(time) = rfc3339_millis(cp.timestamp) {
                xml.push_str(&format!("    <time>{}</time>\n", time));
            }
            xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&cp.name)));
            xml.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&cp.describe())));
            xml.push_str("  </wpt>\n");
        }

        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&self.session_id)));
        xml.push_str("    <trkseg>\n");
        for point in &self.track_points {
            xml.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\">\n",
                point.lat, point.lon
            ));
            if let Some(time) = rfc3339_millis(point.timestamp) {
                xml.push_str(&format!("        <time>{}</time>\n", time));
            }
            xml.push_str("      </trkpt>\n");
        }
        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");

        xml
    }
}

/// Accepts `1` as well as the `"1.0"` string written by older exporters;
/// only the major part is significant.
fn deserialize_version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Number(u32),
        Text(String),
    }

    match Version::deserialize(deserializer)? {
        Version::Number(v) => Ok(v),
        Version::Text(text) => {
            let major = text.split('.').next().unwrap_or_default().trim();
            major.parse().map_err(|_| {
                serde::de::Error::custom(format!("invalid export version '{}'", text))
            })
        }
    }
}

fn rfc3339_millis(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms).single().map(|t| t.to_rfc3339())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
