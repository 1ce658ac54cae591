//! Canonical book catalog and chapter-to-chapter navigation.
//!
//! [`BOOKS`] lists the 66 books of the Protestant canon in reading order.
//! [`next_chapter`] / [`prev_chapter`] walk across book boundaries the way
//! the reader's arrow buttons do.

// ---------------------------------------------------------------------------
// Testament / BibleBook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Testament {
    Old,
    New,
}

/// Static metadata for one book.
#[derive(Debug, PartialEq, Eq)]
pub struct BibleBook {
    /// Stable identifier used in cache keys (e.g. `"GEN"`).
    pub id: &'static str,
    /// Name sent to the text generator and shown in the UI.
    pub name: &'static str,
    /// Number of chapters.
    pub chapters: u32,
    pub testament: Testament,
}

const fn book(id: &'static str, name: &'static str, chapters: u32, testament: Testament) -> BibleBook {
    BibleBook {
        id,
        name,
        chapters,
        testament,
    }
}

use Testament::{New, Old};

/// All books in canonical order.
pub const BOOKS: &[BibleBook] = &[
    book("GEN", "Genesis", 50, Old),
    book("EXO", "Exodus", 40, Old),
    book("LEV", "Leviticus", 27, Old),
    book("NUM", "Numbers", 36, Old),
    book("DEU", "Deuteronomy", 34, Old),
    book("JOS", "Joshua", 24, Old),
    book("JDG", "Judges", 21, Old),
    book("RUT", "Ruth", 4, Old),
    book("1SA", "1 Samuel", 31, Old),
    book("2SA", "2 Samuel", 24, Old),
    book("1KI", "1 Kings", 22, Old),
    book("2KI", "2 Kings", 25, Old),
    book("1CH", "1 Chronicles", 29, Old),
    book("2CH", "2 Chronicles", 36, Old),
    book("EZR", "Ezra", 10, Old),
    book("NEH", "Nehemiah", 13, Old),
    book("EST", "Esther", 10, Old),
    book("JOB", "Job", 42, Old),
    book("PSA", "Psalms", 150, Old),
    book("PRO", "Proverbs", 31, Old),
    book("ECC", "Ecclesiastes", 12, Old),
    book("SNG", "Song of Solomon", 8, Old),
    book("ISA", "Isaiah", 66, Old),
    book("JER", "Jeremiah", 52, Old),
    book("LAM", "Lamentations", 5, Old),
    book("EZK", "Ezekiel", 48, Old),
    book("DAN", "Daniel", 12, Old),
    book("HOS", "Hosea", 14, Old),
    book("JOL", "Joel", 3, Old),
    book("AMO", "Amos", 9, Old),
    book("OBA", "Obadiah", 1, Old),
    book("JON", "Jonah", 4, Old),
    book("MIC", "Micah", 7, Old),
    book("NAM", "Nahum", 3, Old),
    book("HAB", "Habakkuk", 3, Old),
    book("ZEP", "Zephaniah", 3, Old),
    book("HAG", "Haggai", 2, Old),
    book("ZEC", "Zechariah", 14, Old),
    book("MAL", "Malachi", 4, Old),
    book("MAT", "Matthew", 28, New),
    book("MRK", "Mark", 16, New),
    book("LUK", "Luke", 24, New),
    book("JHN", "John", 21, New),
    book("ACT", "Acts", 28, New),
    book("ROM", "Romans", 16, New),
    book("1CO", "1 Corinthians", 16, New),
    book("2CO", "2 Corinthians", 13, New),
    book("GAL", "Galatians", 6, New),
    book("EPH", "Ephesians", 6, New),
    book("PHP", "Philippians", 4, New),
    book("COL", "Colossians", 4, New),
    book("1TH", "1 Thessalonians", 5, New),
    book("2TH", "2 Thessalonians", 3, New),
    book("1TI", "1 Timothy", 6, New),
    book("2TI", "2 Timothy", 4, New),
    book("TIT", "Titus", 3, New),
    book("PHM", "Philemon", 1, New),
    book("HEB", "Hebrews", 13, New),
    book("JAS", "James", 5, New),
    book("1PE", "1 Peter", 5, New),
    book("2PE", "2 Peter", 3, New),
    book("1JN", "1 John", 5, New),
    book("2JN", "2 John", 1, New),
    book("3JN", "3 John", 1, New),
    book("JUD", "Jude", 1, New),
    book("REV", "Revelation", 22, New),
];

// ---------------------------------------------------------------------------
// Lookup / navigation
// ---------------------------------------------------------------------------

/// Find a book by id or by name, ignoring ASCII case.
pub fn find_book(query: &str) -> Option<&'static BibleBook> {
    let query = query.trim();
    BOOKS
        .iter()
        .find(|b| b.id.eq_ignore_ascii_case(query) || b.name.eq_ignore_ascii_case(query))
}

fn position(book: &BibleBook) -> Option<usize> {
    BOOKS.iter().position(|b| b.id == book.id)
}

/// The chapter after `chapter` of `book`, crossing into the next book.
/// `None` after the last chapter of Revelation.
pub fn next_chapter(book: &BibleBook, chapter: u32) -> Option<(&'static BibleBook, u32)> {
    let idx = position(book)?;
    if chapter < book.chapters {
        return Some((&BOOKS[idx], chapter + 1));
    }
    BOOKS.get(idx + 1).map(|next| (next, 1))
}

/// The chapter before `chapter` of `book`, crossing into the previous
/// book's last chapter.  `None` before Genesis 1.
pub fn prev_chapter(book: &BibleBook, chapter: u32) -> Option<(&'static BibleBook, u32)> {
    let idx = position(book)?;
    if chapter > 1 {
        return Some((&BOOKS[idx], chapter - 1));
    }
    let prev = BOOKS.get(idx.checked_sub(1)?)?;
    Some((prev, prev.chapters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_66_books_and_1189_chapters() {
        assert_eq!(BOOKS.len(), 66);
        assert_eq!(BOOKS.iter().map(|b| b.chapters).sum::<u32>(), 1189);
        assert_eq!(BOOKS.iter().filter(|b| b.testament == Testament::New).count(), 27);
    }

    #[test]
    fn find_book_by_id_or_name() {
        assert_eq!(find_book("gen").map(|b| b.name), Some("Genesis"));
        assert_eq!(find_book("song of solomon").map(|b| b.id), Some("SNG"));
        assert!(find_book("Maccabees").is_none());
    }

    #[test]
    fn next_chapter_crosses_books() {
        let gen = find_book("GEN").unwrap();
        assert_eq!(next_chapter(gen, 1).map(|(b, c)| (b.id, c)), Some(("GEN", 2)));
        assert_eq!(next_chapter(gen, 50).map(|(b, c)| (b.id, c)), Some(("EXO", 1)));
        let rev = find_book("REV").unwrap();
        assert!(next_chapter(rev, 22).is_none());
    }

    #[test]
    fn prev_chapter_crosses_books() {
        let exo = find_book("EXO").unwrap();
        assert_eq!(prev_chapter(exo, 1).map(|(b, c)| (b.id, c)), Some(("GEN", 50)));
        assert_eq!(prev_chapter(exo, 3).map(|(b, c)| (b.id, c)), Some(("EXO", 2)));
        let gen = find_book("GEN").unwrap();
        assert!(prev_chapter(gen, 1).is_none());
    }
}
