use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a content item, derived from filesystem evidence.
///
/// READY is expected to be terminal; the external encoding pipeline is
/// responsible for never removing a finished manifest. The classifier
/// only reports what it observes on each query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    /// Encoded manifest present, item is playable.
    Ready,
    /// No manifest yet, but an encode run is in progress.
    NotReady,
    /// No manifest and no run marker: not started or abandoned.
    Incomplete,
}

/// One entry in the content listing. Recomputed on every query, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    pub name: String,
    pub state: ReadinessState,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReadinessState::Ready).unwrap(),
            "\"READY\""
        );
        assert_eq!(
            serde_json::to_string(&ReadinessState::NotReady).unwrap(),
            "\"NOT_READY\""
        );
        assert_eq!(
            serde_json::to_string(&ReadinessState::Incomplete).unwrap(),
            "\"INCOMPLETE\""
        );
    }
}
