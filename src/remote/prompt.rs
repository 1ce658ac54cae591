//! Prompts for the A·chik (Standard Garo) text and speech requests.
//!
//! Chapter text follows the semantic meaning of the Easy English Bible but is
//! written in native SOV A·chik with correct glottal-stop marks (`·`).  Speech
//! requests carry phonetic guidance so the narrator pauses on the glottal
//! stops and keeps syllables evenly stressed.

use crate::audio::SpeechStyle;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Translator persona for chapter text.
pub const CHAPTER_SYSTEM_INSTRUCTION: &str = "\
You are a linguistic expert in PURE A·CHIK (Standard Garo).
SOURCE: Use the semantic meaning of the 'Easy English Bible'.
STRICT LINGUISTIC RULES:
1. NO \"GAROLISH\": Avoid English word order. Use natural A·chik SOV grammar.
2. PURE VOCABULARY: Use authentic terms like 'Dakgipa', 'Ka·saani', 'Nama Katta', 'Gisik Rongtal'.
3. GLOTTAL STOPS: Use '·' correctly (e.g., 'Am·eng·a').
4. NATIVE FLOW: The text must sound like the traditional 'Sastro Song·gital'.";

/// Elder persona for chapter reflections.
pub const REFLECTION_SYSTEM_INSTRUCTION: &str = "\
Act as an A·chik (Garo) Christian Elder and Teacher. \
Speak with \"Ku·pali\" (wisdom) and high-level A·chik vocabulary.";

const REFLECTION_OPENING: &str = "Ia Sastro Song·gitalni bak gimin chinga iandake gisik ra·na man·a...";

/// Prompt for the library-screen verse of the day.
pub const DAILY_VERSE_PROMPT: &str = "\
Provide one encouraging Bible verse translated into pure, poetic A·chik (Garo). \
Return as JSON with 'verse' and 'reference'.";

const PHONETIC_GUIDANCE: &str = "\
Task: Read the following A·chik (Garo) text.
Accent Style: Native A·chik speaker from Tura/Garo Hills.
Phonetic Guidance:
- The symbol '·' indicates a sharp glottal stop. Pause briefly and sharply at these points.
- Syllables should be rhythmic and evenly stressed.
- Avoid the rising intonation of English questions or the heavy stress of English nouns.
- Treat 'ch' like 'ts' in some contexts, and 'j' as soft.";

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// User prompt asking for one chapter as JSON.
pub fn chapter_prompt(book_name: &str, chapter: u32) -> String {
    format!("Provide the full text of the Bible book \"{book_name}\", chapter {chapter} as a JSON object.")
}

/// User prompt asking for a spiritual reflection on `chapter_text`.
pub fn reflection_prompt(chapter_text: &str) -> String {
    format!(
        "Provide a spiritual reflection (Gisikni Nama) on this chapter: {chapter_text}. \
         Start with: \"{REFLECTION_OPENING}\""
    )
}

/// Full text sent to the speech model: guidance, delivery style, then the
/// words to read.
pub fn speech_prompt(text: &str, style: SpeechStyle) -> String {
    let delivery = match style {
        SpeechStyle::Summary => "Speak like a wise elder giving a sermon (Gisikni Katta).",
        SpeechStyle::Verse => "Read clearly and reverently as if in church.",
    };
    format!("{PHONETIC_GUIDANCE}\n- {delivery}\n\nText: {text}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_prompt_names_book_and_chapter() {
        let p = chapter_prompt("Genesis", 3);
        assert!(p.contains("\"Genesis\""));
        assert!(p.contains("chapter 3"));
    }

    #[test]
    fn reflection_prompt_embeds_text_and_opening() {
        let p = reflection_prompt("1. Dakgipa");
        assert!(p.contains("1. Dakgipa"));
        assert!(p.contains(REFLECTION_OPENING));
    }

    #[test]
    fn speech_prompt_switches_delivery() {
        let verse = speech_prompt("Dakgipa", SpeechStyle::Verse);
        let summary = speech_prompt("Dakgipa", SpeechStyle::Summary);
        assert!(verse.contains("reverently"));
        assert!(summary.contains("sermon"));
        assert!(verse.ends_with("Text: Dakgipa"));
    }
}
