use serde::{Deserialize, Serialize};

/// Axis-aligned 2-D box in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// One detected object in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub score: f32,
    pub zone_flag: bool,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    pub object_detection_list: Vec<Detection>,
}

/// Canonical detection map shared by both wire formats.
///
/// Serializes as `{"perception": {"object_detection_list": [...]}}`, the
/// shape both the live stream and the stored telemetry carry. Detections
/// keep wire order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedInference {
    pub perception: Perception,
}

impl ParsedInference {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            perception: Perception {
                object_detection_list: detections,
            },
        }
    }

    /// Result used when a payload cannot be decoded
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.perception.object_detection_list
    }

    pub fn is_empty(&self) -> bool {
        self.detections().is_empty()
    }

    pub fn object_count(&self) -> usize {
        self.detections().len()
    }

    pub fn object_count_in_zone(&self) -> usize {
        self.detections().iter().filter(|d| d.zone_flag).count()
    }

    /// Stringified form persisted alongside each telemetry record
    pub fn to_repr(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
