use std::collections::BTreeMap;

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Class id to label table for a loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames {
    names: BTreeMap<u32, String>,
}

impl ClassNames {
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASSES
                .iter()
                .enumerate()
                .map(|(id, name)| (id as u32, name.to_string()))
                .collect(),
        }
    }

    /// Parse the `names` entry Ultralytics writes into exported ONNX metadata,
    /// e.g. `{0: 'person', 1: 'bicycle'}`.
    ///
    /// Returns `None` if nothing could be parsed.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;

        let mut names = BTreeMap::new();
        let mut rest = body;
        while !rest.trim().is_empty() {
            let (key, after_key) = rest.split_once(':')?;
            let id: u32 = key.trim().trim_start_matches(',').trim().parse().ok()?;

            let after_key = after_key.trim_start();
            let quote = after_key.chars().next().filter(|c| *c == '\'' || *c == '"')?;
            let value_start = &after_key[1..];
            let end = value_start.find(quote)?;

            names.insert(id, value_start[..end].to_string());
            rest = &value_start[end + 1..];
        }

        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    /// Label for `class_id`, or `class_<id>` when the table has no entry.
    pub fn name(&self, class_id: u32) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_table_has_80_entries() {
        let names = ClassNames::coco();
        assert_eq!(names.len(), 80);
        assert_eq!(names.name(0), "person");
        assert_eq!(names.name(79), "toothbrush");
    }

    #[test]
    fn unknown_class_falls_back_to_placeholder() {
        let names = ClassNames::coco();
        assert_eq!(names.name(80), "class_80");
        assert!(names.get(80).is_none());
    }

    #[test]
    fn parses_ultralytics_metadata() {
        let names =
            ClassNames::from_metadata("{0: 'pothole', 1: 'crack', 2: \"manhole cover\"}").unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.name(0), "pothole");
        assert_eq!(names.name(1), "crack");
        assert_eq!(names.name(2), "manhole cover");
    }

    #[test]
    fn parses_names_containing_separators() {
        let names = ClassNames::from_metadata("{0: 'a, b: c', 1: 'd'}").unwrap();
        assert_eq!(names.name(0), "a, b: c");
        assert_eq!(names.name(1), "d");
    }

    #[test]
    fn rejects_malformed_metadata() {
        assert!(ClassNames::from_metadata("").is_none());
        assert!(ClassNames::from_metadata("{}").is_none());
        assert!(ClassNames::from_metadata("['person', 'car']").is_none());
        assert!(ClassNames::from_metadata("{zero: 'person'}").is_none());
    }
}
