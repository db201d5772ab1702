//! Runs against a real exported YOLO model.
//!
//! `MODEL_PATH` must point at an ONNX export and `TEST_IMAGE` at an image
//! containing at least one object the model knows, e.g.
//! `MODEL_PATH=yolo11n.onnx TEST_IMAGE=bus.jpg cargo test -p inference -- --ignored`.

#![cfg(feature = "ort-backend")]

use inference::{Detector, DetectorConfig, bytes_from_image, image_from_bytes};

fn load_detector() -> Detector {
    let model_path = std::env::var("MODEL_PATH").expect("MODEL_PATH must be set");
    let config = DetectorConfig {
        model_path: model_path.clone(),
        fallback_model_path: model_path,
        ..DetectorConfig::default()
    };
    Detector::load(&config)
}

fn load_test_image() -> image::RgbImage {
    let path = std::env::var("TEST_IMAGE").expect("TEST_IMAGE must be set");
    let bytes = std::fs::read(path).expect("failed to read TEST_IMAGE");
    image_from_bytes(&bytes).expect("TEST_IMAGE is not a decodable image")
}

#[test]
#[ignore = "requires MODEL_PATH and TEST_IMAGE"]
fn test_known_image_yields_detections_above_threshold() {
    let detector = load_detector();
    assert!(detector.is_model_ready(), "Model should load");

    let threshold = 0.4;
    let result = detector.run_inference(load_test_image(), threshold);

    assert!(!result.detections.is_empty(), "Expected at least one detection");
    for detection in &result.detections {
        assert!(detection.confidence >= threshold);
        assert!(detection.xmin <= detection.xmax);
        assert!(detection.ymin <= detection.ymax);
        assert!(!detection.name.is_empty());
    }
}

#[test]
#[ignore = "requires MODEL_PATH and TEST_IMAGE"]
fn test_annotated_image_round_trips_through_jpeg() {
    let detector = load_detector();
    let image = load_test_image();
    let dimensions = image.dimensions();

    let result = detector.run_inference(image, 0.25);
    let annotated = detector.get_annotated_image(result.raw.as_ref()).unwrap();

    let bytes = bytes_from_image(&annotated).unwrap();
    assert_eq!(image_from_bytes(&bytes).unwrap().dimensions(), dimensions);
}
