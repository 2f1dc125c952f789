//! Pull the generated artifact out of free-form model output.
//!
//! The personas ask for the artifact between `<markdown_code>` tags, but
//! models drift: tags get cut off mid-stream, replaced with code fences, or
//! dropped entirely. [`extract`] tries, in order:
//!
//! 1. a balanced opening/closing tag pair,
//! 2. an unmatched opening tag, salvaging everything after it,
//! 3. a response made entirely of fenced code blocks,
//! 4. plain conversational text with no artifact.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::variant::{CLOSE_TAG, OPEN_TAG};

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*markdown_code\s*>").expect("valid regex"));
static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*/\s*markdown_code\s*>").expect("valid regex"));

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Tagged,
    Unterminated,
    Fenced,
    #[default]
    ChatOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Conversational text surrounding the artifact.
    pub chat: String,
    /// The artifact, if one was found and is non-empty.
    pub code: Option<String>,
    pub method: ExtractionMethod,
}

impl Extraction {
    pub fn has_code(&self) -> bool {
        self.code.is_some()
    }
}

pub fn extract(text: &str) -> Extraction {
    if let Some(open) = OPEN_TAG_RE.find(text) {
        let before = &text[..open.start()];
        let rest = &text[open.end()..];

        if let Some(close) = CLOSE_TAG_RE.find(rest) {
            let body = &rest[..close.start()];
            let after = &rest[close.end()..];
            return Extraction {
                chat: join_chat(before, after),
                code: non_empty(unwrap_fence(body)),
                method: ExtractionMethod::Tagged,
            };
        }

        let body = drop_partial_suffix(rest, CLOSE_TAG, 2);
        return Extraction {
            chat: before.trim().to_string(),
            code: non_empty(unwrap_fence(body)),
            method: ExtractionMethod::Unterminated,
        };
    }

    let cleaned = CLOSE_TAG_RE.replace_all(text, "");
    if is_all_fenced(&cleaned) {
        return Extraction {
            chat: String::new(),
            code: non_empty(unwrap_fence(&cleaned)),
            method: ExtractionMethod::Fenced,
        };
    }

    Extraction {
        chat: cleaned.trim().to_string(),
        code: None,
        method: ExtractionMethod::ChatOnly,
    }
}

/// Like [`extract`], but first hides a half-received tag at the end of the
/// buffer so a live preview never shows `<markdown_co` as chat text.
pub fn extract_streaming(text: &str) -> Extraction {
    extract(strip_partial_tag(text))
}

/// Remove a trailing prefix of either delimiter tag.
pub fn strip_partial_tag(text: &str) -> &str {
    let text = drop_partial_suffix(text, OPEN_TAG, 1);
    drop_partial_suffix(text, CLOSE_TAG, 1)
}

/// If `text` ends with a proper prefix of `tag` at least `min_len` bytes long,
/// cut it off.
fn drop_partial_suffix<'a>(text: &'a str, tag: &str, min_len: usize) -> &'a str {
    let Some(idx) = text.rfind('<') else {
        return text;
    };
    let tail = &text[idx..];
    if tail.len() >= min_len
        && tail.len() < tag.len()
        && tag.starts_with(&tail.to_ascii_lowercase())
    {
        &text[..idx]
    } else {
        text
    }
}

fn join_chat(before: &str, after: &str) -> String {
    let before = CLOSE_TAG_RE.replace_all(before.trim(), "");
    let after = CLOSE_TAG_RE.replace_all(after.trim(), "");
    match (before.trim().is_empty(), after.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => before.trim().to_string(),
        (true, false) => after.trim().to_string(),
        (false, false) => format!("{}\n\n{}", before.trim(), after.trim()),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

fn is_bare_fence(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.chars().all(|c| c == '`')
}

/// Info string of a fence opener, e.g. `markdown` for "```markdown".
fn fence_info(line: &str) -> &str {
    line.trim().trim_start_matches('`').trim()
}

/// Strip one fenced block wrapping the whole body. A body that opens a fence
/// but never closes it (still streaming) loses only the opening line.
fn unwrap_fence(body: &str) -> String {
    let trimmed = body.trim();
    let lines: Vec<&str> = trimmed.lines().collect();
    let Some(first) = lines.first() else {
        return String::new();
    };
    if !is_fence_line(first) {
        return trimmed.to_string();
    }

    match closing_fence(&lines) {
        Some(close) if close == lines.len() - 1 => lines[1..close].join("\n"),
        Some(_) => trimmed.to_string(),
        None => lines[1..].join("\n").trim_end().to_string(),
    }
}

/// Index of the fence closing the block opened on line 0. Inside a block a
/// fence with an info string opens a nested example and a bare fence closes
/// the innermost one.
fn closing_fence(lines: &[&str]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, line) in lines.iter().enumerate() {
        if !is_fence_line(line) {
            continue;
        }
        if depth == 0 || !fence_info(line).is_empty() {
            depth += 1;
        } else if is_bare_fence(line) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// True when the text is nothing but one or more complete fenced blocks.
fn is_all_fenced(text: &str) -> bool {
    let trimmed = text.trim();
    let mut depth = 0usize;
    let mut blocks = 0;
    for line in trimmed.lines() {
        if !is_fence_line(line) {
            // Text between blocks must be blank.
            if depth == 0 && !line.trim().is_empty() {
                return false;
            }
            continue;
        }
        if depth == 0 || !fence_info(line).is_empty() {
            depth += 1;
        } else if is_bare_fence(line) {
            depth -= 1;
            if depth == 0 {
                blocks += 1;
            }
        }
    }
    depth == 0 && blocks > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_block() {
        let text = "Here you go!\n<markdown_code>\n# Hi there\n</markdown_code>\nEnjoy.";
        let ex = extract(text);
        assert_eq!(ex.method, ExtractionMethod::Tagged);
        assert_eq!(ex.code.as_deref(), Some("# Hi there"));
        assert_eq!(ex.chat, "Here you go!\n\nEnjoy.");
    }

    #[test]
    fn test_tagged_block_with_wrapping_fence() {
        let text = "<markdown_code>\n```markdown\n# Title\n\n```bash\ncargo run\n```\n```\n</markdown_code>";
        let ex = extract(text);
        assert_eq!(ex.method, ExtractionMethod::Tagged);
        assert_eq!(ex.code.as_deref(), Some("# Title\n\n```bash\ncargo run\n```"));
        assert!(ex.chat.is_empty());
    }

    #[test]
    fn test_tags_are_case_and_space_insensitive() {
        let ex = extract("< MARKDOWN_CODE >body</ markdown_code>");
        assert_eq!(ex.method, ExtractionMethod::Tagged);
        assert_eq!(ex.code.as_deref(), Some("body"));
    }

    #[test]
    fn test_first_pair_wins() {
        let ex = extract("<markdown_code>one</markdown_code> and <markdown_code>two</markdown_code>");
        assert_eq!(ex.code.as_deref(), Some("one"));
        assert!(ex.chat.contains("two"));
    }

    #[test]
    fn test_empty_tags_have_no_code() {
        let ex = extract("Sorry.<markdown_code>  \n </markdown_code>");
        assert_eq!(ex.method, ExtractionMethod::Tagged);
        assert_eq!(ex.code, None);
        assert_eq!(ex.chat, "Sorry.");
    }

    #[test]
    fn test_unterminated_salvages_tail() {
        let ex = extract("Working on it\n<markdown_code>\n<svg viewBox=\"0 0 10 10\">\n</markdown_co");
        assert_eq!(ex.method, ExtractionMethod::Unterminated);
        assert_eq!(ex.code.as_deref(), Some("<svg viewBox=\"0 0 10 10\">"));
        assert_eq!(ex.chat, "Working on it");
    }

    #[test]
    fn test_unterminated_drops_open_fence() {
        let ex = extract("<markdown_code>\n```rust\nfn main() {}\n");
        assert_eq!(ex.code.as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn test_unterminated_keeps_lone_angle_bracket() {
        let ex = extract("<markdown_code>if a <");
        assert_eq!(ex.code.as_deref(), Some("if a <"));
    }

    #[test]
    fn test_whole_response_fenced() {
        let ex = extract("```python\nprint('hi')\n```\n");
        assert_eq!(ex.method, ExtractionMethod::Fenced);
        assert_eq!(ex.code.as_deref(), Some("print('hi')"));
        assert!(ex.chat.is_empty());
    }

    #[test]
    fn test_multiple_fenced_blocks_kept_verbatim() {
        let text = "```js\na()\n```\n\n```js\nb()\n```";
        let ex = extract(text);
        assert_eq!(ex.method, ExtractionMethod::Fenced);
        assert_eq!(ex.code.as_deref(), Some(text));
    }

    #[test]
    fn test_separate_markdown_blocks_kept_verbatim() {
        let text = "```md\n# A\n```\n\n```md\n# B\n```";
        let ex = extract(text);
        assert_eq!(ex.method, ExtractionMethod::Fenced);
        assert_eq!(ex.code.as_deref(), Some(text));
    }

    #[test]
    fn test_tagged_separate_markdown_blocks_kept_verbatim() {
        let inner = "```md\n# A\n```\n```md\n# B\n```";
        let ex = extract(&format!("<markdown_code>\n{}\n</markdown_code>", inner));
        assert_eq!(ex.method, ExtractionMethod::Tagged);
        assert_eq!(ex.code.as_deref(), Some(inner));
    }

    #[test]
    fn test_bare_wrapper_around_nested_example_unwraps() {
        let ex = extract("```\n# Tool\n```sh\nmake\n```\n```");
        assert_eq!(ex.method, ExtractionMethod::Fenced);
        assert_eq!(ex.code.as_deref(), Some("# Tool\n```sh\nmake\n```"));
    }

    #[test]
    fn test_fence_with_prose_is_chat() {
        let ex = extract("Try this:\n```js\na()\n```");
        assert_eq!(ex.method, ExtractionMethod::ChatOnly);
        assert_eq!(ex.code, None);
        assert!(ex.chat.starts_with("Try this:"));
    }

    #[test]
    fn test_odd_fence_count_is_chat() {
        let ex = extract("```\nunfinished");
        assert_eq!(ex.method, ExtractionMethod::ChatOnly);
    }

    #[test]
    fn test_plain_chat() {
        let ex = extract("  What colors do you like?  ");
        assert_eq!(ex.method, ExtractionMethod::ChatOnly);
        assert_eq!(ex.chat, "What colors do you like?");
        assert!(!ex.has_code());
    }

    #[test]
    fn test_stray_close_tag_removed_from_chat() {
        let ex = extract("done</markdown_code>");
        assert_eq!(ex.chat, "done");
    }

    #[test]
    fn test_strip_partial_tag() {
        assert_eq!(strip_partial_tag("Sure! <markd"), "Sure! ");
        assert_eq!(strip_partial_tag("x </markdown_c"), "x ");
        assert_eq!(strip_partial_tag("a < b"), "a < b");
        assert_eq!(strip_partial_tag("full <markdown_code>"), "full <markdown_code>");
    }

    #[test]
    fn test_streaming_hides_half_tag() {
        let ex = extract_streaming("Here it is <markdown_");
        assert_eq!(ex.chat, "Here it is");
        assert_eq!(ex.method, ExtractionMethod::ChatOnly);
    }

    #[test]
    fn test_multibyte_text_near_tags() {
        let ex = extract("héllo ✨<markdown_code>日本語</markdown_code>👋");
        assert_eq!(ex.code.as_deref(), Some("日本語"));
        assert_eq!(ex.chat, "héllo ✨\n\n👋");
        assert_eq!(strip_partial_tag("✨<"), "✨");
    }
}
