//! Per-plugin localized text.

use std::{collections::HashMap, sync::Arc};

/// Language code → (text key → template).
pub type LangTable = HashMap<String, HashMap<String, String>>;

/// Looks up a plugin's text for the configured language.
///
/// A missing language or key yields an empty string rather than an error so
/// that plugins without translations keep working.
#[derive(Debug, Clone, Default)]
pub struct TextProducer {
    texts: Option<Arc<HashMap<String, String>>>,
}

impl TextProducer {
    pub fn new(table: &LangTable, language: &str) -> Self {
        Self {
            texts: table.get(language).cloned().map(Arc::new),
        }
    }

    /// A producer that always yields empty text.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_language(&self) -> bool {
        self.texts.is_some()
    }

    /// Text for `key` with `$1..$n` replaced by `values`.
    pub fn get(&self, key: &str, values: &[&str]) -> String {
        self.texts
            .as_ref()
            .and_then(|texts| texts.get(key))
            .map(|template| substitute(template, values))
            .unwrap_or_default()
    }

    /// Like [`get`](Self::get) but falls back to `default` when the key is
    /// missing.
    pub fn get_or(&self, key: &str, default: &str, values: &[&str]) -> String {
        match self.texts.as_ref().and_then(|texts| texts.get(key)) {
            Some(template) => substitute(template, values),
            None => substitute(default, values),
        }
    }

    /// The resolved key → template map, for handing to shell plugins.
    pub fn texts(&self) -> HashMap<String, String> {
        self.texts
            .as_deref()
            .cloned()
            .unwrap_or_default()
    }
}

/// Replace `$1..$n` placeholders with positional values.
///
/// The template is scanned once, reading the full digit run after each `$`,
/// so `$10` is never read as `$1` followed by `0` and placeholders inside a
/// substituted value are left as they are. Indices with no value stay literal.
pub fn substitute(template: &str, values: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let value = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| values.get(idx));
        match value {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[pos..pos + 1 + digits]),
        }
        rest = &after[digits..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LangTable {
        let mut en = HashMap::new();
        en.insert("greet".to_string(), "Hello $1, you have $2 coins".to_string());
        en.insert("plain".to_string(), "no placeholders".to_string());
        let mut table = LangTable::new();
        table.insert("en".to_string(), en);
        table
    }

    #[test]
    fn substitutes_positional_values() {
        let text = TextProducer::new(&table(), "en");
        assert_eq!(text.get("greet", &["Ann", "3"]), "Hello Ann, you have 3 coins");
        assert_eq!(text.get("plain", &["unused"]), "no placeholders");
    }

    #[test]
    fn missing_key_or_language_is_empty() {
        let text = TextProducer::new(&table(), "en");
        assert_eq!(text.get("nope", &[]), "");

        let text = TextProducer::new(&table(), "vi");
        assert!(!text.has_language());
        assert_eq!(text.get("greet", &["Ann"]), "");
        assert_eq!(text.get_or("greet", "Hi $1", &["Ann"]), "Hi Ann");
    }

    #[test]
    fn unfilled_placeholders_are_left_alone() {
        assert_eq!(substitute("$1 and $2", &["a"]), "a and $2");
    }

    #[test]
    fn double_digit_placeholders() {
        let values: Vec<String> = (1..=10).map(|i| format!("v{i}")).collect();
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        assert_eq!(substitute("$1|$10", &values), "v1|v10");
        assert_eq!(substitute("$10 left", &["a", "b"]), "$10 left");
    }

    #[test]
    fn values_are_not_rescanned() {
        assert_eq!(substitute("$1 says $2", &["Ann", "$1"]), "Ann says $1");
        assert_eq!(substitute("cost: $2", &["$", "5"]), "cost: 5");
        assert_eq!(substitute("$ and $0 and $", &["x"]), "$ and $0 and $");
    }
}
