use crate::metrics::PredictionMetrics;
use inference::Detector;
use std::sync::{Arc, OnceLock};

/// Shared handler state. The detector slot stays empty until the model load
/// started at boot finishes, and is filled at most once.
#[derive(Clone)]
pub struct AppState {
    detector: Arc<OnceLock<Arc<Detector>>>,
    pub metrics: Arc<PredictionMetrics>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            detector: Arc::new(OnceLock::new()),
            metrics: Arc::new(PredictionMetrics::new("gateway")),
        }
    }

    pub fn with_detector(detector: Detector) -> Self {
        let state = Self::new();
        state.install(detector);
        state
    }

    /// Publish the loaded detector. Returns `false` if one was already installed.
    pub fn install(&self, detector: Detector) -> bool {
        self.detector.set(Arc::new(detector)).is_ok()
    }

    pub fn detector(&self) -> Option<Arc<Detector>> {
        self.detector.get().cloned()
    }

    pub fn is_model_ready(&self) -> bool {
        self.detector
            .get()
            .is_some_and(|detector| detector.is_model_ready())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
