//! Quote-escape repair for model output that breaks its own string literals.
//!
//! Models writing single-quoted dict literals routinely emit possessives and
//! contractions (`Parkinson's`) that terminate the string early. The repair
//! here is deliberately narrow: escape word-adjacent quotes of one style and
//! nothing else. Mixed contraction styles in one string stay broken.

/// Escape word-adjacent quotes so apostrophes and inch-marks stop
/// terminating their enclosing string literal.
///
/// If the text contains at least one `'`, word-adjacent single quotes are
/// escaped; otherwise word-adjacent double quotes are. A quote is
/// word-adjacent when both neighbors are alphanumeric or `_`. Delimiting
/// quotes (next to punctuation, brackets, or whitespace) are untouched.
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::escape_quotes;
///
/// assert_eq!(
///     escape_quotes("{'note': 'Parkinson's disease'}"),
///     r"{'note': 'Parkinson\'s disease'}"
/// );
/// ```
pub fn escape_quotes(text: &str) -> String {
    let target = if text.contains('\'') { '\'' } else { '"' };
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == target {
            let before = i.checked_sub(1).map(|j| chars[j]);
            let after = chars.get(i + 1).copied();
            let word_adjacent = matches!(before, Some(b) if is_word(b))
                && matches!(after, Some(a) if is_word(a));
            let already_escaped = matches!(before, Some('\\'));
            if word_adjacent && !already_escaped {
                out.push('\\');
            }
        }
        out.push(c);
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
