use crate::classes::ClassNames;
use crate::detection::Detection;
use crate::error::InferenceError;
use ndarray::ArrayViewD;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// Letterbox geometry needed to map model-space boxes back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl TransformParams {
    /// Map an input-space xyxy box back into original image pixels, clamped to bounds.
    #[inline]
    fn to_original(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
        let w = self.orig_width as f32;
        let h = self.orig_height as f32;
        (
            ((x1 - self.offset_x) / self.scale).clamp(0.0, w),
            ((y1 - self.offset_y) / self.scale).clamp(0.0, h),
            ((x2 - self.offset_x) / self.scale).clamp(0.0, w),
            ((y2 - self.offset_y) / self.scale).clamp(0.0, h),
        )
    }
}

pub struct PostProcessor {
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            iou_threshold,
            max_detections,
        }
    }

    /// Decode a YOLO detection head (`[1, 4 + num_classes, num_anchors]`) into
    /// thresholded, NMS-filtered detections sorted by confidence.
    #[tracing::instrument(skip(self, predictions, transform, class_names))]
    pub fn parse_detections(
        &self,
        predictions: &ArrayViewD<f32>,
        confidence_threshold: f32,
        transform: &TransformParams,
        class_names: &ClassNames,
    ) -> Result<Vec<Detection>, InferenceError> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(InferenceError::OutputShape(shape.to_vec()));
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            let mut confidence = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_idx = c;
                }
            }

            if confidence < confidence_threshold {
                continue;
            }

            let cx = predictions[[0, 0, i]];
            let cy = predictions[[0, 1, i]];
            let w = predictions[[0, 2, i]];
            let h = predictions[[0, 3, i]];

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);
            let (xmin, ymin, xmax, ymax) = transform.to_original(x1, y1, x2, y2);

            let class_id = class_idx as u32;
            candidates.push(Detection {
                xmin,
                ymin,
                xmax,
                ymax,
                confidence,
                class_id,
                name: class_names.name(class_id),
            });
        }

        let detections = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::debug!(count = detections.len(), "Decoded detections");
        Ok(detections)
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS)
    }
}

/// Class-aware greedy NMS. Keeps at most `max_detections`, highest confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn identity_transform(size: u32) -> TransformParams {
        TransformParams {
            orig_width: size,
            orig_height: size,
            input_width: size,
            input_height: size,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Build a `[1, 4 + num_classes, n]` YOLO head from (cxcywh, class, score) anchors.
    /// Every other class score is 0.01.
    fn create_yolo_output(anchors: &[([f32; 4], usize, f32)], num_classes: usize) -> Array<f32, IxDyn> {
        let n = anchors.len();
        let mut output = Array::from_elem(IxDyn(&[1, 4 + num_classes, n]), 0.01f32);
        for (i, (bbox, class, score)) in anchors.iter().enumerate() {
            for (k, v) in bbox.iter().enumerate() {
                output[[0, k, i]] = *v;
            }
            output[[0, 4 + class, i]] = *score;
        }
        output
    }

    fn det(xmin: f32, class_id: u32, confidence: f32) -> Detection {
        Detection {
            xmin,
            ymin: 0.0,
            xmax: xmin + 10.0,
            ymax: 10.0,
            confidence,
            class_id,
            name: format!("class_{class_id}"),
        }
    }

    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(50.0, 50.0, 40.0, 20.0);
        assert_eq!((x1, y1, x2, y2), (30.0, 40.0, 70.0, 60.0));
    }

    /// Test that confidence threshold filters detections correctly
    #[test]
    fn test_confidence_threshold_filtering() {
        let output = create_yolo_output(
            &[
                ([100.0, 100.0, 20.0, 20.0], 0, 0.45),
                ([200.0, 200.0, 20.0, 20.0], 1, 0.5),
                ([300.0, 300.0, 20.0, 20.0], 2, 0.8),
            ],
            80,
        );

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.5, &identity_transform(640), &ClassNames::coco())
            .unwrap();

        assert_eq!(detections.len(), 2, "Should filter out confidence < 0.5");
        assert!(detections.iter().all(|d| d.confidence >= 0.5));
        assert_eq!(detections[0].name, "car", "Highest confidence first");
        assert_eq!(detections[1].name, "bicycle", "Boundary case: 0.5 included");
    }

    /// Test coordinate inverse transformation with known values
    #[test]
    fn test_coordinate_inverse_transformation() {
        // Original 800x600 letterboxed into 640x640: scale 0.8, offset_y 80.
        // Box cx=320, cy=320, w=128, h=96 -> xyxy (256, 272, 384, 368)
        //   x1 = 256 / 0.8 = 320, y1 = (272 - 80) / 0.8 = 240
        //   x2 = 384 / 0.8 = 480, y2 = (368 - 80) / 0.8 = 360
        let transform = TransformParams {
            orig_width: 800,
            orig_height: 600,
            input_width: 640,
            input_height: 640,
            scale: 0.8,
            offset_x: 0.0,
            offset_y: 80.0,
        };
        let output = create_yolo_output(&[([320.0, 320.0, 128.0, 96.0], 0, 0.9)], 80);

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.25, &transform, &ClassNames::coco())
            .unwrap();

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert!((d.xmin - 320.0).abs() < 0.01, "xmin = {}", d.xmin);
        assert!((d.ymin - 240.0).abs() < 0.01, "ymin = {}", d.ymin);
        assert!((d.xmax - 480.0).abs() < 0.01, "xmax = {}", d.xmax);
        assert!((d.ymax - 360.0).abs() < 0.01, "ymax = {}", d.ymax);
        assert_eq!(d.class_id, 0);
        assert_eq!(d.name, "person");
    }

    #[test]
    fn test_boxes_clamped_to_image_bounds() {
        let output = create_yolo_output(&[([5.0, 635.0, 40.0, 40.0], 3, 0.9)], 80);

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.5, &identity_transform(640), &ClassNames::coco())
            .unwrap();

        let d = &detections[0];
        assert_eq!(d.xmin, 0.0);
        assert_eq!(d.ymax, 640.0);
    }

    #[test]
    fn test_overlapping_same_class_boxes_are_suppressed() {
        let output = create_yolo_output(
            &[
                ([100.0, 100.0, 50.0, 50.0], 0, 0.9),
                ([102.0, 101.0, 50.0, 50.0], 0, 0.8),
                ([102.0, 101.0, 50.0, 50.0], 16, 0.7),
            ],
            80,
        );

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.5, &identity_transform(640), &ClassNames::coco())
            .unwrap();

        assert_eq!(detections.len(), 2, "Duplicate person box should be dropped");
        assert_eq!(detections[0].name, "person");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(detections[1].name, "dog", "Other classes survive overlap");
    }

    #[test]
    fn test_unknown_class_uses_placeholder_name() {
        let names = ClassNames::from_metadata("{0: 'pothole'}").unwrap();
        let output = create_yolo_output(&[([50.0, 50.0, 10.0, 10.0], 1, 0.9)], 2);

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.5, &identity_transform(640), &names)
            .unwrap();

        assert_eq!(detections[0].class_id, 1);
        assert_eq!(detections[0].name, "class_1");
    }

    #[test]
    fn test_rejects_unexpected_shape() {
        let output = Array::<f32, IxDyn>::zeros(IxDyn(&[1, 4, 10]));

        let result = PostProcessor::default().parse_detections(
            &output.view(),
            0.5,
            &identity_transform(640),
            &ClassNames::coco(),
        );

        assert!(matches!(result, Err(InferenceError::OutputShape(_))));
    }

    #[test]
    fn test_empty_output_yields_no_detections() {
        let output = Array::<f32, IxDyn>::zeros(IxDyn(&[1, 84, 0]));

        let detections = PostProcessor::default()
            .parse_detections(&output.view(), 0.5, &identity_transform(640), &ClassNames::coco())
            .unwrap();

        assert!(detections.is_empty());
    }

    #[test]
    fn test_nms_respects_max_detections() {
        let candidates = (0..10).map(|i| det(i as f32 * 20.0, 0, 0.5 + i as f32 * 0.01)).collect();

        let kept = non_max_suppression(candidates, 0.7, 3);

        assert_eq!(kept.len(), 3);
        assert!(kept[0].confidence > kept[1].confidence);
        assert!(kept[1].confidence > kept[2].confidence);
    }
}
