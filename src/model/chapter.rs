//! Scripture content types shared by the store, the fetcher and playback.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ChapterKey
// ---------------------------------------------------------------------------

/// Identifies one chapter of one book; the primary key of the chapter cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterKey {
    book_id: String,
    chapter: u32,
}

impl ChapterKey {
    /// Build a key.  Chapter numbers are 1-based; `0` is clamped to `1`.
    pub fn new(book_id: impl Into<String>, chapter: u32) -> Self {
        Self {
            book_id: book_id.into(),
            chapter: chapter.max(1),
        }
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    /// Deterministic single-string form, e.g. `"GEN-1"`.  Used as the file
    /// stem of the on-disk entry.
    pub fn composite(&self) -> String {
        let book: String = self
            .book_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{book}-{}", self.chapter)
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.book_id, self.chapter)
    }
}

// ---------------------------------------------------------------------------
// Verse / Chapter
// ---------------------------------------------------------------------------

/// A single numbered verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

impl Verse {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A whole chapter as delivered by the text generator.
///
/// Field names follow the JSON shape the generator is asked to return, so
/// the struct deserialises straight from the model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub book_name: String,
    pub chapter_number: u32,
    pub verses: Vec<Verse>,
}

/// Why a chapter failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChapterError {
    #[error("chapter has no verses")]
    NoVerses,

    #[error("verse number 0 is not allowed")]
    ZeroVerseNumber,

    #[error("verse {0} appears more than once")]
    DuplicateVerse(u32),

    #[error("verse {0} has no text")]
    EmptyVerse(u32),
}

impl Chapter {
    /// Check the invariants the reader relies on and put the verses in
    /// canonical order.
    pub fn normalized(mut self) -> Result<Self, ChapterError> {
        if self.verses.is_empty() {
            return Err(ChapterError::NoVerses);
        }

        let mut seen = HashSet::with_capacity(self.verses.len());
        for verse in &mut self.verses {
            if verse.number == 0 {
                return Err(ChapterError::ZeroVerseNumber);
            }
            if !seen.insert(verse.number) {
                return Err(ChapterError::DuplicateVerse(verse.number));
            }
            let trimmed = verse.text.trim();
            if trimmed.is_empty() {
                return Err(ChapterError::EmptyVerse(verse.number));
            }
            if trimmed.len() != verse.text.len() {
                verse.text = trimmed.to_string();
            }
        }

        self.verses.sort_by_key(|v| v.number);
        Ok(self)
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    /// All verses joined as `"1. text 2. text …"`, the form sent to the
    /// reflection generator.
    pub fn numbered_text(&self) -> String {
        self.verses
            .iter()
            .map(|v| format!("{}. {}", v.number, v.text))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// DailyHighlight
// ---------------------------------------------------------------------------

/// The verse shown on the library screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHighlight {
    pub verse: String,
    pub reference: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(verses: Vec<Verse>) -> Chapter {
        Chapter {
            book_name: "Genesis".into(),
            chapter_number: 1,
            verses,
        }
    }

    #[test]
    fn composite_key_is_stable() {
        assert_eq!(ChapterKey::new("GEN", 3).composite(), "GEN-3");
        assert_eq!(ChapterKey::new("1 SA", 2).composite(), "1_SA-2");
        assert_eq!(ChapterKey::new("GEN", 0).chapter(), 1);
    }

    #[test]
    fn normalized_sorts_verses() {
        let ch = chapter(vec![Verse::new(2, "Ka·saani"), Verse::new(1, " Dakgipa ")])
            .normalized()
            .unwrap();
        assert_eq!(ch.verses[0], Verse::new(1, "Dakgipa"));
        assert_eq!(ch.verses[1].number, 2);
    }

    #[test]
    fn normalized_rejects_bad_chapters() {
        assert_eq!(chapter(vec![]).normalized(), Err(ChapterError::NoVerses));
        assert_eq!(
            chapter(vec![Verse::new(0, "a")]).normalized(),
            Err(ChapterError::ZeroVerseNumber)
        );
        assert_eq!(
            chapter(vec![Verse::new(1, "a"), Verse::new(1, "b")]).normalized(),
            Err(ChapterError::DuplicateVerse(1))
        );
        assert_eq!(
            chapter(vec![Verse::new(4, "  ")]).normalized(),
            Err(ChapterError::EmptyVerse(4))
        );
    }

    #[test]
    fn chapter_deserialises_from_generator_json() {
        let json = r#"{"bookName":"Genesis","chapterNumber":1,
            "verses":[{"number":1,"text":"Dakgipa"}]}"#;
        let ch: Chapter = serde_json::from_str(json).unwrap();
        assert_eq!(ch.book_name, "Genesis");
        assert_eq!(ch.verses.len(), 1);
    }

    #[test]
    fn numbered_text_joins_verses() {
        let ch = chapter(vec![Verse::new(1, "Dakgipa"), Verse::new(2, "Ka·saani")]);
        assert_eq!(ch.numbered_text(), "1. Dakgipa 2. Ka·saani");
    }
}
