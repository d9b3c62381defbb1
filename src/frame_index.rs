use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::types::FrameIndex;

// Naming patterns tried in order; the first capture group is the frame number
const FRAME_PATTERNS: &[&str] = &[
    r"(?i)(\d+)\.txt$",
    r"(?i)_(\d+)\.txt$",
    r"(?i)frame_?(\d+)\.txt$",
    r"(?i)img_?(\d+)\.txt$",
    r"(?i)image_?(\d+)\.txt$",
];

static FRAME_REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
static DIGITS_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn frame_regexes() -> &'static [Regex] {
    FRAME_REGEXES.get_or_init(|| {
        FRAME_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

fn digits_regex() -> Option<&'static Regex> {
    DIGITS_REGEX
        .get_or_init(|| Regex::new(r"\d+").ok())
        .as_ref()
}

/// Extract the frame number from a label file name such as `frame_0042.txt`.
///
/// Known naming patterns are tried first; otherwise the last group of digits
/// anywhere in the name is used. Returns `None` when the name carries no
/// number, or when the number does not fit a [`FrameIndex`].
pub fn extract_frame_index(file_name: &str) -> Option<FrameIndex> {
    for re in frame_regexes() {
        if let Some(captures) = re.captures(file_name) {
            return captures.get(1)?.as_str().parse().ok();
        }
    }

    digits_regex()?
        .find_iter(file_name)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract the frame number from a path's file name
pub fn frame_index_of(path: &Path) -> Option<FrameIndex> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(extract_frame_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(extract_frame_index("0001.txt"), Some(1));
        assert_eq!(extract_frame_index("42.TXT"), Some(42));
    }

    #[test]
    fn test_prefixed_names() {
        assert_eq!(extract_frame_index("frame_0042.txt"), Some(42));
        assert_eq!(extract_frame_index("frame17.txt"), Some(17));
        assert_eq!(extract_frame_index("img_003.txt"), Some(3));
        assert_eq!(extract_frame_index("IMAGE120.txt"), Some(120));
        assert_eq!(extract_frame_index("video2_clip_0815.txt"), Some(815));
    }

    #[test]
    fn test_fallback_to_last_number() {
        assert_eq!(extract_frame_index("cam2_12_final.txt"), Some(12));
        assert_eq!(extract_frame_index("run7-v3.label"), Some(3));
    }

    #[test]
    fn test_unresolvable_names() {
        assert_eq!(extract_frame_index("labels.txt"), None);
        assert_eq!(extract_frame_index(""), None);
        assert_eq!(extract_frame_index("99999999999999999999999.txt"), None);
    }

    #[test]
    fn test_frame_index_of_path() {
        assert_eq!(frame_index_of(Path::new("/data/run1/frame_0009.txt")), Some(9));
        assert_eq!(frame_index_of(Path::new("/data/run1/notes.txt")), None);
    }
}
