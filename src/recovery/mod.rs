//! Recovery of structured data from truncated or lightly malformed model
//! output.
//!
//! The entry point is [`fit`]: evaluate the text directly, and when that
//! fails, run a bounded search over closing-bracket suffixes (trimming the
//! text from the right as needed) for the longest reconstruction. Helpers
//! cover the common pre-repair steps: [`escape_quotes`] for apostrophes that
//! break single-quoted literals, and [`extract_objects`] for structured
//! blobs buried in prose.
//!
//! Evaluation uses a restricted literal parser ([`literal_eval`]) that
//! accepts JSON plus the Python-isms models produce (single-quoted strings,
//! `True`/`False`/`None`, trailing commas) while rejecting everything with
//! expression semantics.

pub mod extract;
pub mod literal;
pub mod parser;
pub mod quotes;

pub use extract::extract_objects;
pub use literal::{is_valid_container, literal_eval, LiteralError};
pub use parser::{
    complete_object, fit, fit_observed, possible_completions, possible_completions_observed,
    suffixes, CompletionResult, RejectCallback, Suffixes, ValueKind,
};
pub use quotes::escape_quotes;
