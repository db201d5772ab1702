use crate::{
    annotate::Annotator,
    backend::InferenceBackend,
    classes::ClassNames,
    config::DetectorConfig,
    detection::Detection,
    error::{InferenceError, Result},
    processing::{post::PostProcessor, pre::PreProcessor},
};
use image::RgbImage;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Everything needed to render an annotated image for one inference call.
#[derive(Debug, Clone)]
pub struct RawResults {
    pub image: RgbImage,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceResult {
    pub detections: Vec<Detection>,
    /// `None` when the model is not ready or inference failed.
    pub raw: Option<RawResults>,
}

struct LoadedModel {
    // ONNX Runtime sessions need `&mut` to run; one forward pass at a time.
    backend: Mutex<Box<dyn InferenceBackend + Send>>,
    class_names: ClassNames,
    path: String,
}

/// The process-wide detection model.
pub struct Detector {
    model: Option<LoadedModel>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    annotator: Annotator,
}

impl Detector {
    /// Load the model named by `config` with the default backend.
    #[cfg(feature = "ort-backend")]
    pub fn load(config: &DetectorConfig) -> Self {
        Self::load_with::<crate::backend::ort::OrtBackend>(config)
    }

    /// Load the configured model, falling back to the pretrained one when the
    /// custom file is missing. A failed load yields a detector that is not ready.
    pub fn load_with<B>(config: &DetectorConfig) -> Self
    where
        B: InferenceBackend + Send + 'static,
    {
        let path = resolve_model_path(config);

        match B::load_model(&path) {
            Ok(backend) => {
                tracing::info!(path = %path, "Detection model ready");
                Self::from_backend(backend, path, config)
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Error initializing detection model");
                Self::unavailable(config)
            }
        }
    }

    /// Wrap an already loaded backend.
    pub fn with_backend<B>(backend: B, config: &DetectorConfig) -> Self
    where
        B: InferenceBackend + Send + 'static,
    {
        Self::from_backend(backend, "<in-memory>".to_string(), config)
    }

    /// A detector with no model. Inference returns empty results.
    pub fn unavailable(config: &DetectorConfig) -> Self {
        Self {
            model: None,
            ..Self::pipeline(config)
        }
    }

    fn from_backend<B>(backend: B, path: String, config: &DetectorConfig) -> Self
    where
        B: InferenceBackend + Send + 'static,
    {
        let class_names = backend.class_names().unwrap_or_default();
        Self {
            model: Some(LoadedModel {
                backend: Mutex::new(Box::new(backend)),
                class_names,
                path,
            }),
            ..Self::pipeline(config)
        }
    }

    fn pipeline(config: &DetectorConfig) -> Self {
        Self {
            model: None,
            preprocessor: PreProcessor::new((config.input_size, config.input_size)),
            postprocessor: PostProcessor::new(config.iou_threshold, config.max_detections),
            annotator: Annotator::load(config.font_path.as_deref()),
        }
    }

    pub fn is_model_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_path(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.path.as_str())
    }

    pub fn class_names(&self) -> Option<&ClassNames> {
        self.model.as_ref().map(|m| &m.class_names)
    }

    /// Detect objects in `image`, keeping boxes scoring at least `confidence_threshold`.
    ///
    /// Never fails: when the model is not ready or any stage errors, the error is
    /// logged and an empty result is returned.
    pub fn run_inference(&self, image: RgbImage, confidence_threshold: f32) -> InferenceResult {
        let Some(model) = &self.model else {
            tracing::warn!("Model not ready for inference");
            return InferenceResult::default();
        };

        let confidence_threshold = if confidence_threshold.is_finite() {
            confidence_threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        };

        match self.detect(model, &image, confidence_threshold) {
            Ok(detections) => InferenceResult {
                detections: detections.clone(),
                raw: Some(RawResults { image, detections }),
            },
            Err(e) => {
                tracing::error!(error = %e, "Error in detection");
                InferenceResult::default()
            }
        }
    }

    fn detect(
        &self,
        model: &LoadedModel,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let start = Instant::now();

        let (input, transform) = self.preprocessor.preprocess(image)?;

        let output = {
            // A panic mid-run leaves no partial state in the session
            let mut backend = model.backend.lock().unwrap_or_else(PoisonError::into_inner);
            backend.infer(&input)?
        };

        let detections = self.postprocessor.parse_detections(
            &output.predictions.view(),
            confidence_threshold,
            &transform,
            &model.class_names,
        )?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            detections = detections.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Inference complete"
        );

        Ok(detections)
    }

    /// Render the boxes of an inference call onto its source image.
    pub fn get_annotated_image(&self, raw: Option<&RawResults>) -> Result<RgbImage> {
        let raw = raw.ok_or(InferenceError::NoResults)?;
        Ok(self.annotator.draw(&raw.image, &raw.detections))
    }
}

fn resolve_model_path(config: &DetectorConfig) -> String {
    if Path::new(&config.model_path).exists() {
        tracing::info!(path = %config.model_path, "Using custom model");
        config.model_path.clone()
    } else {
        tracing::info!(
            missing = %config.model_path,
            path = %config.fallback_model_path,
            "Custom model not found, using pretrained model"
        );
        config.fallback_model_path.clone()
    }
}
