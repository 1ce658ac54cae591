//! Line-based console commands.
//!
//! [`parse_command`] turns one input line into a [`ConsoleCommand`].  Book
//! names may contain spaces (`open 1 Samuel 3`, `download Song of Solomon`);
//! verse numbers are 1-based as printed.

use thiserror::Error;

use crate::audio::VoiceId;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Open { book: String, chapter: u32 },
    Next,
    Prev,
    /// Verse index (0-based); `None` resumes from the start.
    Play(Option<usize>),
    Toggle,
    Stop,
    Summary,
    Retry,
    Skip,
    Dismiss,
    Rate(f32),
    Voice(VoiceId),
    Download(String),
    Progress(String),
    Books,
    Daily,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),

    #[error("{0}")]
    InvalidVoice(String),
}

pub const HELP: &str = "\
commands:
  open <book> <chapter>   read a chapter
  next | prev             move one chapter
  play [verse]            play from a verse (default 1)
  toggle | stop           pause/resume, stop
  summary                 play the chapter reflection
  retry | skip | dismiss  recover from an error
  rate <x>                playback speed, e.g. 1.25
  voice <name>            Puck, Charon, Kore, Zephyr
  download <book>         save a whole book offline
  progress <book>         offline completeness of a book
  books | daily | quit";

pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "open" | "o" => {
            let (chapter, book) = rest.split_last().ok_or(CommandError::MissingArgument {
                command: "open",
                what: "a book and a chapter",
            })?;
            if book.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "open",
                    what: "a book and a chapter",
                });
            }
            ConsoleCommand::Open {
                book: book.join(" "),
                chapter: parse_number(chapter)?,
            }
        }
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "p" => ConsoleCommand::Prev,
        "play" => match rest.first() {
            None => ConsoleCommand::Play(None),
            Some(n) => {
                let verse: u32 = parse_number(n)?;
                ConsoleCommand::Play(Some(verse.saturating_sub(1) as usize))
            }
        },
        "toggle" | "t" => ConsoleCommand::Toggle,
        "stop" | "s" => ConsoleCommand::Stop,
        "summary" | "reflection" => ConsoleCommand::Summary,
        "retry" | "r" => ConsoleCommand::Retry,
        "skip" => ConsoleCommand::Skip,
        "dismiss" => ConsoleCommand::Dismiss,
        "rate" => {
            let raw = rest.first().ok_or(CommandError::MissingArgument {
                command: "rate",
                what: "a speed",
            })?;
            ConsoleCommand::Rate(
                raw.parse::<f32>()
                    .map_err(|_| CommandError::InvalidNumber(raw.to_string()))?,
            )
        }
        "voice" => {
            let raw = rest.first().ok_or(CommandError::MissingArgument {
                command: "voice",
                what: "a voice name",
            })?;
            ConsoleCommand::Voice(raw.parse().map_err(CommandError::InvalidVoice)?)
        }
        "download" => ConsoleCommand::Download(book_argument("download", &rest)?),
        "progress" => ConsoleCommand::Progress(book_argument("progress", &rest)?),
        "books" => ConsoleCommand::Books,
        "daily" => ConsoleCommand::Daily,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn parse_number(raw: &str) -> Result<u32, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

fn book_argument(command: &'static str, rest: &[&str]) -> Result<String, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            what: "a book",
        });
    }
    Ok(rest.join(" "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_with_multi_word_book() {
        assert_eq!(
            parse_command("open 1 Samuel 3"),
            Ok(ConsoleCommand::Open {
                book: "1 Samuel".into(),
                chapter: 3
            })
        );
        assert_eq!(
            parse_command("  O   gen  1 "),
            Ok(ConsoleCommand::Open {
                book: "gen".into(),
                chapter: 1
            })
        );
    }

    #[test]
    fn open_needs_book_and_chapter() {
        assert!(matches!(
            parse_command("open 3"),
            Err(CommandError::MissingArgument { command: "open", .. })
        ));
        assert_eq!(
            parse_command("open Genesis one"),
            Err(CommandError::InvalidNumber("one".into()))
        );
    }

    #[test]
    fn play_is_one_based() {
        assert_eq!(parse_command("play"), Ok(ConsoleCommand::Play(None)));
        assert_eq!(parse_command("play 1"), Ok(ConsoleCommand::Play(Some(0))));
        assert_eq!(parse_command("play 12"), Ok(ConsoleCommand::Play(Some(11))));
    }

    #[test]
    fn rate_and_voice() {
        assert_eq!(parse_command("rate 1.25"), Ok(ConsoleCommand::Rate(1.25)));
        assert_eq!(parse_command("voice kore"), Ok(ConsoleCommand::Voice(VoiceId::Kore)));
        assert!(matches!(parse_command("voice bob"), Err(CommandError::InvalidVoice(_))));
        assert!(matches!(parse_command("rate fast"), Err(CommandError::InvalidNumber(_))));
    }

    #[test]
    fn book_commands_join_words() {
        assert_eq!(
            parse_command("download Song of Solomon"),
            Ok(ConsoleCommand::Download("Song of Solomon".into()))
        );
        assert!(parse_command("progress").is_err());
    }

    #[test]
    fn empty_and_unknown() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(parse_command("fly"), Err(CommandError::Unknown("fly".into())));
        assert_eq!(parse_command("QUIT"), Ok(ConsoleCommand::Quit));
    }
}
