use crate::error::ApiError;
use inference::{DEFAULT_CONFIDENCE_THRESHOLD, Detection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    /// Each instance should be an object carrying a base64 `image`; shape is
    /// checked per instance so malformed ones produce a precise 400.
    pub instances: Vec<Value>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionParameters {
    pub confidence: f32,
    pub return_annotated_image: bool,
}

impl Default for PredictionParameters {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            return_annotated_image: false,
        }
    }
}

impl PredictionParameters {
    /// Read the recognized keys; unknown keys are ignored and `null` means default.
    pub fn from_map(parameters: Option<&Map<String, Value>>) -> Result<Self, ApiError> {
        let mut parsed = Self::default();
        let Some(parameters) = parameters else {
            return Ok(parsed);
        };

        match parameters.get("confidence") {
            None | Some(Value::Null) => {}
            Some(value) => {
                parsed.confidence = value.as_f64().ok_or_else(|| {
                    ApiError::BadRequest("'confidence' must be a number".to_string())
                })? as f32;
            }
        }

        match parameters.get("return_annotated_image") {
            None | Some(Value::Null) => {}
            Some(value) => {
                parsed.return_annotated_image = value.as_bool().ok_or_else(|| {
                    ApiError::BadRequest("'return_annotated_image' must be a boolean".to_string())
                })?;
            }
        }

        Ok(parsed)
    }
}

/// Pull the base64 payload out of one instance.
pub fn instance_image(instance: &Value) -> Result<&str, ApiError> {
    let Value::Object(fields) = instance else {
        return Err(ApiError::BadRequest("Invalid instance format".to_string()));
    };

    match fields.get("image") {
        Some(Value::String(image)) => Ok(image),
        Some(_) => Err(ApiError::BadRequest(
            "'image' field must be a base64 string".to_string(),
        )),
        None => Err(ApiError::BadRequest(
            "Instance must contain 'image' field".to_string(),
        )),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Prediction {
    pub detections: Vec<FormattedDetection>,
    pub detection_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

impl Prediction {
    pub fn new(detections: &[Detection], annotated_image: Option<String>) -> Self {
        let detections: Vec<FormattedDetection> = detections.iter().map(Into::into).collect();
        Self {
            detection_count: detections.len(),
            detections,
            annotated_image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedDetection {
    /// Label name of the detected class.
    pub class: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl From<&Detection> for FormattedDetection {
    fn from(d: &Detection) -> Self {
        Self {
            class: d.name.clone(),
            confidence: d.confidence,
            bbox: BoundingBox {
                xmin: d.xmin,
                ymin: d.ymin,
                xmax: d.xmax,
                ymax: d.ymax,
            },
        }
    }
}
