use super::format::InferenceFormat;
use super::model::{BoundingBox, Detection, ParsedInference};
use super::schema::{self, BoundingBox2d, GeneralObject, BOUNDING_BOX_2D};
use crate::error::DecodeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{error, trace};

/// Decodes base64 inference payloads of one wire format into the canonical model
#[derive(Debug, Clone, Copy)]
pub struct InferenceDecoder {
    format: InferenceFormat,
}

impl InferenceDecoder {
    pub fn new(format: InferenceFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> InferenceFormat {
        self.format
    }

    /// Decode a base64 payload, surfacing any malformation
    pub fn decode(&self, payload: &str) -> Result<ParsedInference, DecodeError> {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| DecodeError::Base64 {
                details: e.to_string(),
            })?;
        self.decode_bytes(&bytes)
    }

    /// Decode an already base64-decoded FlatBuffers buffer
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<ParsedInference, DecodeError> {
        let top = schema::root(bytes).map_err(|e| DecodeError::InvalidFlatbuffer {
            details: e.to_string(),
        })?;
        let objects = top
            .perception()
            .ok_or(DecodeError::MissingField {
                field: "perception",
            })?
            .object_detection_list()
            .ok_or(DecodeError::MissingField {
                field: "object_detection_list",
            })?;

        let detections = objects
            .iter()
            .map(|object| self.decode_object(&object))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            "Decoded {} detections ({})",
            detections.len(),
            self.format
        );
        Ok(ParsedInference::new(detections))
    }

    /// Decode, collapsing any failure into an empty detection list.
    ///
    /// Callers cannot tell "no objects" from "malformed payload" through
    /// this entry point; use [`InferenceDecoder::decode`] for that.
    pub fn decode_lenient(&self, payload: &str) -> ParsedInference {
        match self.decode(payload) {
            Ok(inference) => inference,
            Err(e) => {
                error!("Failed to deserialize inference data ({}): {}", self.format, e);
                ParsedInference::empty()
            }
        }
    }

    fn decode_object(&self, object: &GeneralObject<'_>) -> Result<Detection, DecodeError> {
        let missing_box = || DecodeError::MissingField {
            field: "bounding_box",
        };

        match self.format {
            InferenceFormat::ZoneDetection => {
                let bounding_box = if object.bounding_box_type() == BOUNDING_BOX_2D {
                    let value = object.bounding_box_as_2d().ok_or_else(missing_box)?;
                    Some(to_box(&value))
                } else {
                    None
                };

                Ok(Detection {
                    class_id: object.class_id(),
                    score: object.score(),
                    zone_flag: object.zoneflag(),
                    bounding_box,
                })
            }
            InferenceFormat::ObjectDetectionExpanded => {
                // The box is read as a 2-D box whatever the union tag says
                let value = object.bounding_box_as_2d().ok_or_else(missing_box)?;

                Ok(Detection {
                    class_id: object.class_id(),
                    score: object.score(),
                    // Not transmitted by this format: every object counts as in-zone
                    zone_flag: true,
                    bounding_box: Some(to_box(&value)),
                })
            }
        }
    }
}

fn to_box(value: &BoundingBox2d<'_>) -> BoundingBox {
    BoundingBox {
        left: f64::from(value.left()),
        top: f64::from(value.top()),
        right: f64::from(value.right()),
        bottom: f64::from(value.bottom()),
    }
}

/// Decode a payload with the given format, surfacing failures
pub fn decode(payload: &str, format: InferenceFormat) -> Result<ParsedInference, DecodeError> {
    InferenceDecoder::new(format).decode(payload)
}

/// Decode a payload with the given format; malformed input yields no detections
pub fn decode_lenient(payload: &str, format: InferenceFormat) -> ParsedInference {
    InferenceDecoder::new(format).decode_lenient(payload)
}
