//! Reads the collation index that defines which chapters exist.

use std::path::Path;

/// Chapters listed in the collation index, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationIndex {
    /// Keys that name a chapter number. Other keys are skipped.
    pub chapters: Vec<u32>,
    /// The last key in document order, which bounds every bake request.
    pub maximum: u32,
}

pub async fn read_index(index: &Path) -> Result<CollationIndex, CollationError> {
    let text = tokio::fs::read_to_string(index).await?;
    parse_index(&text)
}

/// The index is a JSON object keyed by chapter number; the last key in
/// document order is the maximum.
pub fn parse_index(text: &str) -> Result<CollationIndex, CollationError> {
    let data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
    let last = data.keys().next_back().ok_or(CollationError::Empty)?;
    let maximum = last
        .trim()
        .parse()
        .map_err(|_| CollationError::BadKey(last.clone()))?;
    let chapters = data.keys().filter_map(|k| k.trim().parse().ok()).collect();
    Ok(CollationIndex { chapters, maximum })
}

/// Whether the collation index is present on disk.
pub async fn exists(index: &Path) -> bool {
    tokio::fs::try_exists(index).await.unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum CollationError {
    #[error("Could not read collation index: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collation index is not a JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Collation index has no chapters")]
    Empty,

    #[error("Collation key {0:?} is not a chapter number")]
    BadKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_key_wins_even_when_not_largest() {
        // Document order matters, not numeric order.
        let text = r#"{"1": {}, "2": {}, "15": {}, "3": {}}"#;
        assert_eq!(parse_index(text).unwrap().maximum, 3);
    }

    #[test]
    fn test_typical_index() {
        let text = r#"{"1": {"1": []}, "2": {}, "20": {}}"#;
        let index = parse_index(text).unwrap();
        assert_eq!(index.maximum, 20);
        assert_eq!(index.chapters, vec![1, 2, 20]);
    }

    #[test]
    fn test_chapters_follow_keys_not_maximum() {
        let index = parse_index(r#"{"1": {}, "preface": {}, "1000000000": {}}"#).unwrap();
        assert_eq!(index.maximum, 1_000_000_000);
        assert_eq!(index.chapters, vec![1, 1_000_000_000]);
    }

    #[test]
    fn test_empty_index() {
        assert!(matches!(parse_index("{}"), Err(CollationError::Empty)));
    }

    #[test]
    fn test_non_numeric_key() {
        assert!(matches!(
            parse_index(r#"{"intro": {}}"#),
            Err(CollationError::BadKey(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("collations.json");
        assert!(!exists(&path).await);
        assert!(matches!(read_index(&path).await, Err(CollationError::Io(_))));
    }
}
