use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary schema version a device encodes its inference payload with.
///
/// Fixed for the lifetime of a collector: it is decided by the client that
/// was active when the collector was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InferenceFormat {
    /// Objects carry an optional 2-D box and a device-computed zone flag
    ZoneDetection,
    /// Every object carries a 2-D box; no zone flag on the wire
    ObjectDetectionExpanded,
}

impl InferenceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceFormat::ZoneDetection => "ZONE_DETECTION",
            InferenceFormat::ObjectDetectionExpanded => "OBJECT_DETECTION_EXPANDED",
        }
    }
}

impl fmt::Display for InferenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
