//! Bounded completion search for truncated JSON-like output.
//!
//! [`fit`] is the entry point: try the text as-is, and when that fails, search
//! over closing-bracket suffixes (with progressive right-trimming of the text)
//! for the longest structured value that can be reconstructed. The search is
//! exhaustive up to `depth_limit` and deterministic, so callers can rank and
//! compare candidates across runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::recovery::literal::{literal_eval, LiteralError};

/// Type alias for the callback invoked on each rejected trial suffix.
///
/// Arguments: `(suffix, final_evaluation_error)`. The error is the one that
/// stopped the progressive trim for that suffix. Purely diagnostic — the
/// observer never affects the returned result.
pub type RejectCallback<'a> = Option<&'a mut (dyn FnMut(&str, &LiteralError) + Send)>;

/// The shape of a recovered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// A JSON object / mapping.
    Object,
    /// A JSON array / sequence.
    Array,
    /// Anything else (string, number, boolean, null).
    Scalar,
}

impl ValueKind {
    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            _ => ValueKind::Scalar,
        }
    }
}

/// Outcome of a recovery attempt.
///
/// This is the only signal the parser emits: internal evaluation errors are
/// converted into `Failed`, never propagated, so `fit` itself cannot fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionResult {
    /// A structured value was recovered.
    Completed {
        /// The candidate with the longest serialized form.
        best: Value,
        /// Every candidate found, ranked by serialized length descending.
        /// Empty when the input evaluated directly without repair.
        alternatives: Vec<Value>,
        /// The shape of `best`.
        kind: ValueKind,
    },
    /// Nothing evaluable could be reconstructed within the depth limit.
    Failed {
        /// Human-readable description of the exhaustion.
        message: String,
    },
}

impl CompletionResult {
    /// Whether a structured value was recovered.
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionResult::Completed { .. })
    }

    /// The best recovered value, if any.
    pub fn completion(&self) -> Option<&Value> {
        match self {
            CompletionResult::Completed { best, .. } => Some(best),
            CompletionResult::Failed { .. } => None,
        }
    }

    /// The ranked candidate list (empty for direct parses and failures).
    pub fn alternatives(&self) -> &[Value] {
        match self {
            CompletionResult::Completed { alternatives, .. } => alternatives,
            CompletionResult::Failed { .. } => &[],
        }
    }

    /// The failure message, if the attempt failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            CompletionResult::Failed { message } => Some(message),
            CompletionResult::Completed { .. } => None,
        }
    }
}

/// Repair a truncated or lightly malformed JSON-like fragment.
///
/// Strategy:
/// 1. Evaluate `text` directly. A mapping or sequence short-circuits with
///    `alternatives = []`.
/// 2. Strip trailing whitespace and any trailing run of bracket characters
///    (remnants of an earlier, already-broken completion), then search every
///    closing-bracket suffix up to `depth_limit - 1` characters, right-trimming
///    the text one character at a time when a suffix does not fit.
/// 3. Rank successes by serialized length; the longest wins.
///
/// A `depth_limit` of 0 or 1, or text with no brackets at all, yields
/// `Failed` immediately. `fit` never panics.
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::fit;
///
/// let result = fit(r#"{"a": 1, "b": 2"#, 10);
/// assert_eq!(result.completion().unwrap()["b"], 2);
/// ```
pub fn fit(text: &str, depth_limit: usize) -> CompletionResult {
    fit_observed(text, depth_limit, None)
}

/// [`fit`] with an observer for rejected trial suffixes.
pub fn fit_observed(
    text: &str,
    depth_limit: usize,
    observer: RejectCallback<'_>,
) -> CompletionResult {
    if let Ok(value) = literal_eval(text) {
        if value.is_object() || value.is_array() {
            let kind = ValueKind::of(&value);
            return CompletionResult::Completed {
                best: value,
                alternatives: Vec::new(),
                kind,
            };
        }
    }

    let stripped = strip_completion_remnants(text);
    let candidates = possible_completions_observed(stripped, depth_limit, observer);
    match candidates.first().cloned() {
        Some(best) => {
            let kind = ValueKind::of(&best);
            CompletionResult::Completed {
                best,
                alternatives: candidates,
                kind,
            }
        }
        None => CompletionResult::Failed {
            message: format!(
                "could not reconstruct a valid structure within depth limit {}",
                depth_limit
            ),
        },
    }
}

/// Strip trailing whitespace and any trailing run of bracket characters.
///
/// Leftover closers from a prior truncation can never extend a completion;
/// they only force extra trim iterations for every trial suffix.
fn strip_completion_remnants(text: &str) -> &str {
    text.trim_end().trim_end_matches(['[', ']', '{', '}'])
}

/// All candidate completions of `text`, ranked by serialized length descending.
///
/// Ties keep enumeration order (shorter suffixes first). Returns an empty
/// list when `text` contains no brackets or no suffix within `depth_limit`
/// produces an evaluable result.
pub fn possible_completions(text: &str, depth_limit: usize) -> Vec<Value> {
    possible_completions_observed(text, depth_limit, None)
}

/// [`possible_completions`] with an observer for rejected trial suffixes.
pub fn possible_completions_observed(
    text: &str,
    depth_limit: usize,
    mut observer: RejectCallback<'_>,
) -> Vec<Value> {
    // Only closers whose opener actually appears can participate.
    let mut alphabet = Vec::new();
    if text.contains('{') {
        alphabet.push('}');
    }
    if text.contains('[') {
        alphabet.push(']');
    }
    if alphabet.is_empty() {
        return Vec::new();
    }

    // The outermost literal pins the final character of every viable suffix.
    let end_mark = match text.trim().chars().next() {
        Some('[') => Some(']'),
        Some('{') => Some('}'),
        _ => None,
    };

    let mut candidates = Vec::new();
    for suffix in suffixes(&alphabet, depth_limit, end_mark) {
        match complete_object(text, &suffix) {
            Ok(value) => candidates.push(value),
            Err(err) => {
                if let Some(ref mut cb) = observer {
                    cb(&suffix, &err);
                }
            }
        }
    }

    // Stable sort: equal lengths keep enumeration order.
    candidates.sort_by_key(|v| std::cmp::Reverse(v.to_string().len()));
    candidates
}

/// Complete a fragment by appending a fixed suffix, trimming the fragment
/// from the right until the pair evaluates.
///
/// Truncation rarely stops at a clean boundary — it is as likely to cut
/// mid-string or mid-number as between values. Trimming trailing characters
/// until the tail is a clean literal boundary recovers both cases uniformly.
///
/// Fails (with the last evaluation error) if the fragment empties first.
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::complete_object;
///
/// let v = complete_object(r#"{"a": 1, "b": 2"#, "}").unwrap();
/// assert_eq!(v["a"], 1);
///
/// assert!(complete_object(r#"{"a": 1"#, "").is_err());
/// ```
pub fn complete_object(text: &str, suffix: &str) -> Result<Value, LiteralError> {
    let mut fragment = text.to_string();
    let mut last_err = None;
    loop {
        if fragment.is_empty() {
            return Err(last_err.unwrap_or(LiteralError::UnexpectedEnd));
        }
        match literal_eval(&format!("{}{}", fragment, suffix)) {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                fragment.pop();
            }
        }
    }
}

/// Create the lazy suffix enumeration over a closing-mark alphabet.
///
/// Yields every string over `alphabet` of length 1 through `depth_limit - 1`
/// inclusive, ordered by increasing length and, within a length, by product
/// order (last position varies fastest). When `end_mark` is set, only
/// suffixes ending in that mark are yielded.
///
/// The ordering is a contract — candidate ranking ties are broken by it.
///
/// # Examples
///
/// ```
/// use prompt_forge::recovery::suffixes;
///
/// let all: Vec<String> = suffixes(&['}', ']'], 3, Some('}')).collect();
/// assert_eq!(all, vec!["}", "}}", "]}"]);
/// ```
pub fn suffixes(alphabet: &[char], depth_limit: usize, end_mark: Option<char>) -> Suffixes {
    let max_len = depth_limit.saturating_sub(1);
    Suffixes {
        alphabet: alphabet.to_vec(),
        max_len,
        end_mark,
        odometer: vec![0],
        exhausted: alphabet.is_empty() || max_len == 0,
    }
}

/// Lazy enumerator of closing-bracket suffixes. See [`suffixes`].
#[derive(Debug, Clone)]
pub struct Suffixes {
    alphabet: Vec<char>,
    max_len: usize,
    end_mark: Option<char>,
    /// Indices into `alphabet`, most significant first; the last digit
    /// varies fastest.
    odometer: Vec<usize>,
    exhausted: bool,
}

impl Suffixes {
    fn advance(&mut self) {
        let base = self.alphabet.len();
        let mut i = self.odometer.len();
        loop {
            if i == 0 {
                // Every digit rolled over: move to the next length.
                let next_len = self.odometer.len() + 1;
                if next_len > self.max_len {
                    self.exhausted = true;
                } else {
                    self.odometer = vec![0; next_len];
                }
                return;
            }
            i -= 1;
            self.odometer[i] += 1;
            if self.odometer[i] < base {
                return;
            }
            self.odometer[i] = 0;
        }
    }
}

impl Iterator for Suffixes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if self.exhausted {
                return None;
            }
            let candidate: String = self.odometer.iter().map(|&i| self.alphabet[i]).collect();
            self.advance();
            let keep = match self.end_mark {
                Some(mark) => candidate.ends_with(mark),
                None => true,
            };
            if keep {
                return Some(candidate);
            }
        }
    }
}
