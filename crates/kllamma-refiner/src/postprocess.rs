//! Cleanup applied to raw model replies before they are stored.

const LABELS: &[&str] = &["refined prompt:", "improved prompt:"];

/// Normalize a raw refinement reply.
///
/// Trims the reply, then strips one surrounding Markdown code fence, one pair
/// of matching quotes and a leading "Refined prompt:" label. Returns `None`
/// when nothing is left.
pub fn clean_refinement(raw: &str) -> Option<String> {
    let mut text = raw.trim();

    text = strip_code_fence(text).trim();
    text = strip_quotes(text).trim();
    text = strip_label(text).trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };

    // Drop a language tag such as ```text on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if is_language_tag(info.trim()) => body,
        _ => inner,
    }
}

fn is_language_tag(info: &str) -> bool {
    info.is_empty()
        || (info.starts_with(|c: char| c.is_ascii_lowercase())
            && info
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
}

fn strip_quotes(text: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

fn strip_label(text: &str) -> &str {
    for label in LABELS {
        if text.len() >= label.len()
            && text.is_char_boundary(label.len())
            && text[..label.len()].eq_ignore_ascii_case(label)
        {
            return &text[label.len()..];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(
            clean_refinement("  Write a haiku about autumn.\n").as_deref(),
            Some("Write a haiku about autumn.")
        );
    }

    #[test]
    fn test_strips_code_fence_with_info_string() {
        let raw = "```text\nWrite a haiku about autumn.\n```";
        assert_eq!(
            clean_refinement(raw).as_deref(),
            Some("Write a haiku about autumn.")
        );
    }

    #[test]
    fn test_fence_keeps_content_on_opening_line() {
        assert_eq!(
            clean_refinement("```Summarize\nthe text```").as_deref(),
            Some("Summarize\nthe text")
        );
        assert_eq!(
            clean_refinement("```\nList three facts.\n```").as_deref(),
            Some("List three facts.")
        );
        assert_eq!(
            clean_refinement("```c++\nExplain templates.\n```").as_deref(),
            Some("Explain templates.")
        );
    }

    #[test]
    fn test_strips_quotes_and_label() {
        assert_eq!(
            clean_refinement("\"Refined prompt: List three facts.\"").as_deref(),
            Some("List three facts.")
        );
        assert_eq!(
            clean_refinement("REFINED PROMPT:\nList three facts.").as_deref(),
            Some("List three facts.")
        );
        assert_eq!(
            clean_refinement("“Summarize the text.”").as_deref(),
            Some("Summarize the text.")
        );
    }

    #[test]
    fn test_inner_quotes_are_kept() {
        assert_eq!(
            clean_refinement("Explain the word \"idiom\".").as_deref(),
            Some("Explain the word \"idiom\".")
        );
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(clean_refinement(""), None);
        assert_eq!(clean_refinement("   \n"), None);
        assert_eq!(clean_refinement("```\n```"), None);
        assert_eq!(clean_refinement("\"\""), None);
        assert_eq!(clean_refinement("\""), Some("\"".to_string()));
    }
}
