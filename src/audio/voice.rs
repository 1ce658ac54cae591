//! Narrator voices and delivery styles offered by the speech service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prebuilt narrator voice.
///
/// | Variant  | Label    | Character |
/// |----------|----------|-----------|
/// | `Puck`   | Male 1   | Deep      |
/// | `Charon` | Male 2   | Asian     |
/// | `Kore`   | Female 1 | Soft      |
/// | `Zephyr` | Female 2 | Elder     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoiceId {
    #[default]
    Puck,
    Charon,
    Kore,
    Zephyr,
}

impl VoiceId {
    pub const ALL: [VoiceId; 4] = [VoiceId::Puck, VoiceId::Charon, VoiceId::Kore, VoiceId::Zephyr];

    /// Name sent to the speech service.
    pub fn api_name(self) -> &'static str {
        match self {
            VoiceId::Puck => "Puck",
            VoiceId::Charon => "Charon",
            VoiceId::Kore => "Kore",
            VoiceId::Zephyr => "Zephyr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VoiceId::Puck => "Male 1 (Deep)",
            VoiceId::Charon => "Male 2 (Asian)",
            VoiceId::Kore => "Female 1 (Soft)",
            VoiceId::Zephyr => "Female 2 (Elder)",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for VoiceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoiceId::ALL
            .into_iter()
            .find(|v| v.api_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown voice: {s}"))
    }
}

/// How the narrator should deliver the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechStyle {
    /// Clear, reverent reading of a single verse.
    Verse,
    /// An elder's sermon delivery for the chapter reflection.
    Summary,
}
