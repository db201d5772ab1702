pub mod annotate;
pub mod backend;
pub mod classes;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod image_io;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use classes::ClassNames;
pub use config::DetectorConfig;
pub use detection::Detection;
pub use detector::{DEFAULT_CONFIDENCE_THRESHOLD, Detector, InferenceResult, RawResults};
pub use error::InferenceError;
pub use image_io::{bytes_from_image, image_from_bytes};
