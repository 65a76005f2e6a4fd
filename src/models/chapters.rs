use garde::Validate;
use serde::Deserialize;

/// A validated, inclusive range of chapters to bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct ChapterRange {
    #[garde(range(min = 1))]
    pub start: u32,

    #[garde(range(min = 1))]
    pub stop: u32,
}

impl ChapterRange {
    /// Accept the range only if `1 <= start <= stop <= maximum_chapter`.
    pub fn checked(start: u32, stop: u32, maximum_chapter: u32) -> Option<Self> {
        let range = Self { start, stop };
        range.validate().ok()?;
        (range.start <= range.stop && range.stop <= maximum_chapter).then_some(range)
    }
}

/// Fields posted by the baking form. Either `range` with a start/stop pair
/// or `one` with a single chapter.
#[derive(Debug, Default, Deserialize)]
pub struct BakeForm {
    pub range: Option<String>,
    pub one: Option<String>,
    pub start_chapter: Option<String>,
    pub stop_chapter: Option<String>,
    pub chapter: Option<String>,
}

impl BakeForm {
    pub fn is_submission(&self) -> bool {
        self.range.as_deref().is_some_and(|v| !v.is_empty())
            || self.one.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Resolve the submitted chapters against the collation maximum.
    pub fn chapter_range(&self, maximum_chapter: u32) -> Option<ChapterRange> {
        let (start, stop) = if self.range.as_deref().is_some_and(|v| !v.is_empty()) {
            (
                parse_chapter(self.start_chapter.as_deref())?,
                parse_chapter(self.stop_chapter.as_deref())?,
            )
        } else {
            let chapter = parse_chapter(self.chapter.as_deref())?;
            (chapter, chapter)
        };
        ChapterRange::checked(start, stop, maximum_chapter)
    }
}

/// Chapters are plain decimal digits; signs, whitespace and words are rejected.
fn parse_chapter(raw: Option<&str>) -> Option<u32> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_form(start: &str, stop: &str) -> BakeForm {
        BakeForm {
            range: Some("Bake".to_string()),
            start_chapter: Some(start.to_string()),
            stop_chapter: Some(stop.to_string()),
            ..Default::default()
        }
    }

    fn one_form(chapter: &str) -> BakeForm {
        BakeForm {
            one: Some("Bake".to_string()),
            chapter: Some(chapter.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_sensible_range() {
        assert_eq!(
            range_form("9", "10").chapter_range(20),
            Some(ChapterRange { start: 9, stop: 10 })
        );
    }

    #[test]
    fn test_backwards_range_rejected() {
        assert_eq!(range_form("10", "1").chapter_range(20), None);
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert_eq!(range_form("aaa", "bbb").chapter_range(20), None);
        assert_eq!(one_form("aaa").chapter_range(20), None);
        assert_eq!(one_form("-3").chapter_range(20), None);
        assert_eq!(one_form("").chapter_range(20), None);
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(ChapterRange::checked(0, 3, 20), None);
    }

    #[test]
    fn test_above_maximum_rejected() {
        assert_eq!(one_form("1000000").chapter_range(20), None);
        assert_eq!(one_form("21").chapter_range(20), None);
        assert!(one_form("20").chapter_range(20).is_some());
    }

    #[test]
    fn test_single_chapter_range() {
        let range = one_form("5").chapter_range(20).unwrap();
        assert_eq!(range, ChapterRange { start: 5, stop: 5 });
    }

    #[test]
    fn test_submission_detection() {
        assert!(!BakeForm::default().is_submission());
        assert!(one_form("1").is_submission());
    }
}
