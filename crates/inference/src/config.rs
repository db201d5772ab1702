use crate::processing::post::{DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS};
use common::{env_or, env_parse_or};
use std::env;

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_MODEL_PATH: &str = "models/best.onnx";
pub const DEFAULT_FALLBACK_MODEL_PATH: &str = "yolo11n.onnx";

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Custom model, used when the file exists.
    pub model_path: String,
    /// Pretrained model loaded when `model_path` is missing.
    pub fallback_model_path: String,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub font_path: Option<String>,
}

impl DetectorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            model_path: env_or("MODEL_PATH", DEFAULT_MODEL_PATH),
            fallback_model_path: env_or("FALLBACK_MODEL_PATH", DEFAULT_FALLBACK_MODEL_PATH),
            input_size: input_size_from_env(),
            iou_threshold: env_parse_or("IOU_THRESHOLD", DEFAULT_IOU_THRESHOLD),
            max_detections: env_parse_or("MAX_DETECTIONS", DEFAULT_MAX_DETECTIONS),
            font_path: env::var("ANNOTATION_FONT_PATH").ok().filter(|s| !s.is_empty()),
        }
    }
}

fn input_size_from_env() -> u32 {
    match env_parse_or("INPUT_SIZE", DEFAULT_INPUT_SIZE) {
        0 => {
            tracing::warn!(default = DEFAULT_INPUT_SIZE, "INPUT_SIZE must be positive, using default");
            DEFAULT_INPUT_SIZE
        }
        size => size,
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            fallback_model_path: DEFAULT_FALLBACK_MODEL_PATH.to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            font_path: None,
        }
    }
}
