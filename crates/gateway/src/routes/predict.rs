use crate::{
    error::ApiError,
    extract::ApiJson,
    schema::{Prediction, PredictionParameters, PredictionRequest, PredictionResponse, instance_image},
    state::AppState,
};
use axum::{Json, extract::State};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::RgbImage;
use inference::{Detector, InferenceResult, bytes_from_image, image_from_bytes};
use std::sync::Arc;
use std::time::Instant;

pub async fn predict(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let parameters = PredictionParameters::from_map(request.parameters.as_ref())?;

    // Validate and decode every instance before running the model on any of them
    let images = request
        .instances
        .iter()
        .map(|instance| decode_image(instance_image(instance)?))
        .collect::<Result<Vec<_>, _>>()?;

    let detector = state.detector();
    let mut predictions = Vec::with_capacity(images.len());

    for image in images {
        let start = Instant::now();
        let prediction = predict_instance(detector.clone(), image, parameters).await?;

        state
            .metrics
            .duration_histogram
            .record(start.elapsed().as_secs_f64(), &[]);
        state
            .metrics
            .detections_counter
            .add(prediction.detection_count as u64, &[]);

        predictions.push(prediction);
    }
    state
        .metrics
        .instances_counter
        .add(predictions.len() as u64, &[]);

    let total_detections: usize = predictions.iter().map(|p| p.detection_count).sum();
    tracing::info!(
        instances = request.instances.len(),
        detections = total_detections,
        "Processed {} instances, found {} total detections",
        request.instances.len(),
        total_detections
    );

    Ok(Json(PredictionResponse { predictions }))
}

fn decode_image(encoded: &str) -> Result<RgbImage, ApiError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image data: {e}")))?;

    image_from_bytes(&bytes).map_err(|e| ApiError::BadRequest(format!("Invalid image data: {e}")))
}

/// Run one instance on the blocking pool; the forward pass and JPEG encoding are CPU bound.
async fn predict_instance(
    detector: Option<Arc<Detector>>,
    image: RgbImage,
    parameters: PredictionParameters,
) -> Result<Prediction, ApiError> {
    let Some(detector) = detector else {
        tracing::warn!("Model still loading, returning empty detections");
        return Ok(Prediction::new(&[], None));
    };

    tokio::task::spawn_blocking(move || -> Result<Prediction, ApiError> {
        let result = detector.run_inference(image, parameters.confidence);
        let annotated_image = if parameters.return_annotated_image {
            annotate(&detector, &result)?
        } else {
            None
        };
        Ok(Prediction::new(&result.detections, annotated_image))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// Base64 JPEG of the annotated image, only when something was detected.
fn annotate(detector: &Detector, result: &InferenceResult) -> Result<Option<String>, ApiError> {
    if result.detections.is_empty() {
        return Ok(None);
    }

    let annotated = detector.get_annotated_image(result.raw.as_ref())?;
    let jpeg = bytes_from_image(&annotated)?;
    Ok(Some(BASE64.encode(jpeg)))
}
