//! Extraction of complete structured literals embedded in prose.
//!
//! Models often wrap their structured answer in commentary ("Here is the
//! JSON you asked for: {...}. Let me know..."). This scan pulls out every
//! complete top-level object or array literal, ignoring the surrounding
//! text.

use serde_json::Value;

use crate::recovery::literal::literal_eval;

/// Extract every complete top-level `{...}` / `[...]` literal from `text`.
///
/// Bracket matching is quote- and escape-aware, so braces inside string
/// literals do not confuse the scan. A balanced span that does not evaluate
/// as a literal is skipped past its opening bracket and the scan continues,
/// so one malformed blob does not hide later valid ones.
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::extract_objects;
///
/// let found = extract_objects("Sure! {'a': 1} and also [2, 3].");
/// assert_eq!(found.len(), 2);
/// ```
pub fn extract_objects(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '{' && chars[i] != '[' {
            i += 1;
            continue;
        }
        match find_balanced_end(&chars, i) {
            Some(end) => {
                let span: String = chars[i..=end].iter().collect();
                match literal_eval(&span) {
                    Ok(value) if value.is_object() || value.is_array() => {
                        found.push(value);
                        i = end + 1;
                    }
                    _ => i += 1,
                }
            }
            None => i += 1,
        }
    }
    found
}

/// Index of the closing bracket matching the opener at `start`, or `None`
/// if the span is unbalanced.
fn find_balanced_end(chars: &[char], start: usize) -> Option<usize> {
    let open = chars[start];
    let close = if open == '{' { '}' } else { ']' };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut string_quote = '"';
    let mut escaped = false;

    for (offset, &c) in chars[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == string_quote {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = true;
                string_quote = c;
            }
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
