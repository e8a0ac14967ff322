//! Text-run segmentation: plain text, inline images, escaped-newline boundaries.

use regex::Regex;
use std::sync::OnceLock;

use crate::node::{TextRun, ESCAPED_NEWLINE};
use crate::options::EmojiTable;

fn emoji_regex() -> &'static Regex {
    static EMOJI_REGEX: OnceLock<Regex> = OnceLock::new();
    EMOJI_REGEX.get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").unwrap())
}

/// Split decoded text into runs, preserving character order.
///
/// `[name]` becomes an inline image when `name` is in the table; unknown
/// names stay literal. Each literal `\n` escape becomes its own placeholder run.
pub fn segment_text(text: &str, emoji: &EmojiTable) -> Vec<TextRun> {
    let mut runs = Vec::new();

    if emoji.is_empty() {
        push_plain(&mut runs, text);
        return runs;
    }

    let mut last = 0;
    for caps in emoji_regex().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(file) = emoji.resolve(name.as_str()) else {
            continue;
        };
        push_plain(&mut runs, &text[last..whole.start()]);
        runs.push(TextRun::InlineImage {
            base_url: emoji.base_url.clone(),
            token: file.to_string(),
        });
        last = whole.end();
    }
    push_plain(&mut runs, &text[last..]);
    runs
}

fn push_plain(runs: &mut Vec<TextRun>, text: &str) {
    let mut pieces = text.split(ESCAPED_NEWLINE).peekable();
    while let Some(piece) = pieces.next() {
        if !piece.is_empty() {
            runs.push(TextRun::plain(piece));
        }
        if pieces.peek().is_some() {
            runs.push(TextRun::plain(ESCAPED_NEWLINE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmojiTable {
        EmojiTable::new("/emojis/").with_token("smile", "00.gif")
    }

    #[test]
    fn test_plain_only() {
        assert_eq!(segment_text("hello", &EmojiTable::default()), vec![TextRun::plain("hello")]);
    }

    #[test]
    fn test_emoji_between_text() {
        let runs = segment_text("hi [smile] there", &table());
        assert_eq!(
            runs,
            vec![
                TextRun::plain("hi "),
                TextRun::InlineImage {
                    base_url: "/emojis/".to_string(),
                    token: "00.gif".to_string(),
                },
                TextRun::plain(" there"),
            ]
        );
    }

    #[test]
    fn test_unknown_token_stays_literal() {
        assert_eq!(segment_text("[frown]", &table()), vec![TextRun::plain("[frown]")]);
    }

    #[test]
    fn test_escaped_newline_is_boundary() {
        let runs = segment_text("a\\nb", &EmojiTable::default());
        assert_eq!(
            runs,
            vec![TextRun::plain("a"), TextRun::plain("\\n"), TextRun::plain("b")]
        );
    }
}
