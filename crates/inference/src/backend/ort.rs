use super::{InferenceBackend, InferenceOutput};
use crate::classes::ClassNames;
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

const INPUT_NAME: &str = "images";
const NAMES_METADATA_KEY: &str = "names";

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

impl ExecutionProvider {
    pub fn preferred() -> Self {
        #[cfg(feature = "cuda")]
        {
            ExecutionProvider::Cuda
        }
        #[cfg(not(feature = "cuda"))]
        {
            ExecutionProvider::Cpu
        }
    }
}

pub struct OrtBackend {
    session: Session,
    class_names: Option<ClassNames>,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: &str,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;
        let class_names = read_class_names(&session);

        tracing::info!(
            path,
            classes = class_names.as_ref().map(ClassNames::len),
            "Model loaded"
        );
        Ok(Self {
            session,
            class_names,
        })
    }
}

fn read_class_names(session: &Session) -> Option<ClassNames> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom(NAMES_METADATA_KEY)?;
    let names = ClassNames::from_metadata(&raw);
    if names.is_none() {
        tracing::warn!(raw = %raw, "Could not parse class names from model metadata");
    }
    names
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, ExecutionProvider::preferred())
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(images.view())?
        ])?;

        let predictions = outputs[0].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }

    fn class_names(&self) -> Option<ClassNames> {
        self.class_names.clone()
    }
}
