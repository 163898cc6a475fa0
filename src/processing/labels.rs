//! Class label tables.
//!
//! Ultralytics ONNX exports carry their label table in the `names` metadata
//! entry, formatted like a Python dict: `{0: 'person', 1: 'bicycle', ...}`.

use regex::Regex;

/// The 80 COCO labels, used when the model carries no `names` metadata.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub fn coco_class_names() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}

/// Parse an Ultralytics `names` metadata string into an index-ordered table.
///
/// Indices missing from the dict are filled with their numeric id. Returns
/// `None` if no `index: 'name'` pair is found.
pub fn parse_names_metadata(raw: &str) -> Option<Vec<String>> {
    let pattern = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#).ok()?;

    let pairs: Vec<(usize, String)> = pattern
        .captures_iter(raw)
        .filter_map(|cap| {
            let index = cap[1].parse::<usize>().ok()?;
            Some((index, cap[2].to_string()))
        })
        .collect();

    let len = pairs.iter().map(|(i, _)| i + 1).max()?;
    let mut names: Vec<String> = (0..len).map(|i| i.to_string()).collect();
    for (index, name) in pairs {
        names[index] = name;
    }
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ultralytics_names() {
        let names = parse_names_metadata("{0: 'person', 1: 'bicycle', 2: \"traffic light\"}").unwrap();
        assert_eq!(names, vec!["person", "bicycle", "traffic light"]);
    }

    #[test]
    fn test_parse_fills_gaps() {
        let names = parse_names_metadata("{0: 'cat', 2: 'dog'}").unwrap();
        assert_eq!(names, vec!["cat", "1", "dog"]);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_names_metadata("not a dict").is_none());
        assert!(parse_names_metadata("{}").is_none());
    }

    #[test]
    fn test_coco_table() {
        let names = coco_class_names();
        assert_eq!(names.len(), 80);
        assert_eq!(names[0], "person");
        assert_eq!(names[2], "car");
    }
}
