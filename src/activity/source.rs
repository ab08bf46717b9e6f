//! Pull interface to the telemetry provider.

use std::path::{Path, PathBuf};

use crate::{
    activity::model::{Activity, ActivityTelemetry},
    foundation::error::{TopotrackError, TopotrackResult},
};

/// Where activity telemetry comes from.
///
/// `Ok(None)` means the data has not arrived yet. Errors are surfaced as
/// [`TopotrackError::TelemetryUnavailable`] and never retried here.
pub trait TelemetrySource {
    fn pull(&self, activity_id: &str) -> TopotrackResult<Option<ActivityTelemetry>>;
}

/// What the renderer knows about telemetry at a given moment.
#[derive(Clone, Debug)]
pub enum TelemetryState {
    Loading,
    Ready(ActivityTelemetry),
    Failed(String),
}

impl TelemetryState {
    pub fn pull(source: &dyn TelemetrySource, activity_id: &str) -> Self {
        match source.pull(activity_id) {
            Ok(Some(t)) => Self::Ready(t),
            Ok(None) => Self::Loading,
            Err(e) => {
                tracing::warn!(activity = activity_id, error = %e, "telemetry fetch failed");
                Self::Failed(e.to_string())
            }
        }
    }

    pub fn ready(&self) -> Option<&ActivityTelemetry> {
        match self {
            Self::Ready(t) => Some(t),
            _ => None,
        }
    }
}

/// On-disk activity document: metadata plus samples.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ActivityDocument {
    pub activity: Activity,
    pub samples: ActivityTelemetry,
}

impl ActivityDocument {
    pub fn read(path: &Path) -> TopotrackResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TopotrackError::telemetry(format!("read activity '{}': {e}", path.display()))
        })?;
        let doc: Self = serde_json::from_str(&text).map_err(|e| {
            TopotrackError::telemetry(format!("parse activity '{}': {e}", path.display()))
        })?;
        doc.samples.validate()?;
        Ok(doc)
    }
}

/// Serves a single activity document from a JSON file.
#[derive(Clone, Debug)]
pub struct JsonActivitySource {
    path: PathBuf,
    activity_id: String,
}

impl JsonActivitySource {
    /// Reads the metadata eagerly; samples are loaded on each pull.
    pub fn open(path: impl Into<PathBuf>) -> TopotrackResult<(Self, Activity)> {
        let path = path.into();
        let doc = ActivityDocument::read(&path)?;
        let source = Self {
            path,
            activity_id: doc.activity.id.clone(),
        };
        Ok((source, doc.activity))
    }
}

impl TelemetrySource for JsonActivitySource {
    fn pull(&self, activity_id: &str) -> TopotrackResult<Option<ActivityTelemetry>> {
        if activity_id != self.activity_id {
            return Err(TopotrackError::telemetry(format!(
                "unknown activity '{activity_id}'"
            )));
        }
        Ok(Some(ActivityDocument::read(&self.path)?.samples))
    }
}
