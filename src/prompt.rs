//! Prompt rendering: `{key}` placeholder substitution and discovery.

use std::collections::BTreeMap;

/// Sentinel that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
/// Sentinel for escaped closing brace.
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

/// Variables available to a template, keyed by placeholder name.
///
/// Ordered so that rendered prompts (and thus cache keys) are deterministic
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub data: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, builder style.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Merge `other` on top of `self`; keys in `other` win.
    pub fn merged_with(&self, other: &TemplateVars) -> TemplateVars {
        let mut data = self.data.clone();
        data.extend(other.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        TemplateVars { data }
    }
}

/// Build a prompt string with variable substitution.
///
/// Replaces `{key}` placeholders in the template with values from `vars`.
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
/// Placeholders without a matching variable are left in place; callers that
/// want this to be an error validate with [`template_variables`] first.
///
/// # Example
///
/// ```
/// use prompt_forge::prompt::{render, TemplateVars};
///
/// let vars = TemplateVars::new().insert("name", "Alice");
/// let result = render("Hello {name}, output JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Alice, output JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &TemplateVars) -> String {
    // Pass 1: protect escaped braces
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    // Pass 2: substitute placeholders
    for (key, value) in &vars.data {
        let placeholder = format!("{{{}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }

    // Pass 3: restore escaped braces
    rendered = rendered.replace(ESCAPE_SENTINEL, "{");
    rendered = rendered.replace(ESCAPE_SENTINEL_CLOSE, "}");
    rendered
}

/// List the placeholder names a template references, in order of first
/// appearance, without duplicates. Escaped braces (`{{`, `}}`) and spans
/// containing non-identifier characters are not placeholders.
///
/// # Example
///
/// ```
/// use prompt_forge::prompt::template_variables;
///
/// let vars = template_variables("Classify {text_input} into {labels}. {{not_a_var}}");
/// assert_eq!(vars, vec!["text_input", "labels"]);
/// ```
pub fn template_variables(template: &str) -> Vec<String> {
    let protected = template
        .replace("{{", ESCAPE_SENTINEL)
        .replace("}}", ESCAPE_SENTINEL_CLOSE);
    let chars: Vec<char> = protected.chars().collect();
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '{' {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut name = String::new();
        let mut valid = false;
        while j < chars.len() {
            let c = chars[j];
            if c == '}' {
                valid = !name.is_empty();
                break;
            }
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            j += 1;
        }
        if valid {
            if !names.contains(&name) {
                names.push(name);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let vars = TemplateVars::new().insert("name", "Alice").insert("task", "ner");
        let result = render("Hello {name}, run {task}", &vars);
        assert_eq!(result, "Hello Alice, run ner");
    }

    #[test]
    fn test_render_no_placeholders() {
        let result = render("static prompt", &TemplateVars::new());
        assert_eq!(result, "static prompt");
    }

    #[test]
    fn test_render_unknown_placeholder_left_in_place() {
        let result = render("Hello {name}", &TemplateVars::new());
        assert_eq!(result, "Hello {name}");
    }

    #[test]
    fn test_render_escaped_braces() {
        let vars = TemplateVars::new().insert("name", "Alice");
        let result = render("Hello {name}, JSON: {{\"key\": \"val\"}}", &vars);
        assert_eq!(result, r#"Hello Alice, JSON: {"key": "val"}"#);
    }

    #[test]
    fn test_render_nested_escaped_braces() {
        let result = render(
            "Output format: {{\"result\": {{\"value\": 42}}}}",
            &TemplateVars::new(),
        );
        assert_eq!(result, r#"Output format: {"result": {"value": 42}}"#);
    }

    #[test]
    fn test_template_variables_order_and_dedup() {
        let vars = template_variables("{a} then {b} then {a} again");
        assert_eq!(vars, vec!["a", "b"]);
    }

    #[test]
    fn test_template_variables_skip_escaped_and_invalid() {
        let vars = template_variables("{{literal}} {real} {not valid} {also-not}");
        assert_eq!(vars, vec!["real"]);
    }

    #[test]
    fn test_template_variables_empty_braces() {
        assert!(template_variables("nothing {} here").is_empty());
    }

    #[test]
    fn test_vars_merge_precedence() {
        let base = TemplateVars::new().insert("a", "1").insert("b", "2");
        let over = TemplateVars::new().insert("b", "override");
        let merged = base.merged_with(&over);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("override"));
    }
}
