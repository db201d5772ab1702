use crate::classes::ClassNames;
use ndarray::{Array, ArrayD, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run the forward pass on a `[1, 3, H, W]` input in [0, 1].
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class labels embedded in the model, if the export carried them.
    fn class_names(&self) -> Option<ClassNames> {
        None
    }
}

pub struct InferenceOutput {
    pub predictions: ArrayD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh in input pixels + class scores
}
