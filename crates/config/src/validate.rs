//! Configuration validation.
//!
//! Detects syntax errors, unknown or misspelled fields, type errors, and
//! settings that parse but cannot work.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    path::{Path, PathBuf},
};

use crate::{env_subst::substitute_env, loader::parse_config, schema::HeraldConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic",
    /// "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.prefx"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}]: {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Warn when plugins ship text tables but none for `language`.
    ///
    /// `available` is the union of languages declared by loaded plugins.
    pub fn check_language(&mut self, language: &str, available: &BTreeSet<String>) {
        if available.is_empty() || available.contains(language) {
            return;
        }
        let known = available.iter().cloned().collect::<Vec<_>>().join(", ");
        self.diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "bot.language",
            format!("no plugin provides text for \"{language}\" (available: {known})"),
        ));
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar or list value, stop recursion.
    Leaf,
}

/// Mirror of every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        (
            "bot",
            Struct(HashMap::from([
                ("prefix", Leaf),
                ("language", Leaf),
                ("admins", Leaf),
                ("nsfw_threads", Leaf),
            ])),
        ),
        (
            "plugins",
            Struct(HashMap::from([
                ("commands_dir", Leaf),
                ("events_dir", Leaf),
                ("watch", Leaf),
            ])),
        ),
        (
            "stream",
            Struct(HashMap::from([("refresh_interval_secs", Leaf)])),
        ),
        (
            "bootstrap",
            Struct(HashMap::from([
                ("retry_delay_secs", Leaf),
                ("max_attempts", Leaf),
            ])),
        ),
        (
            "notices",
            Struct(HashMap::from([
                ("cooldown", Leaf),
                ("nsfw", Leaf),
                ("admin", Leaf),
            ])),
        ),
        (
            "console",
            Struct(HashMap::from([
                ("user_id", Leaf),
                ("user_name", Leaf),
                ("thread_id", Leaf),
            ])),
        ),
        ("metrics", Struct(HashMap::from([("enabled", Leaf)]))),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_str(&content, &actual_path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate config text without touching the file system. `path` only
/// selects the format by extension.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let raw = substitute_env(raw);

    // 1. Syntax
    let value: serde_json::Value = match parse_config(&raw, path) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                e.to_string(),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    // 3. Types, then semantics on the typed config
    match serde_json::from_value::<HeraldConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Check an already loaded config for settings that cannot work.
#[must_use]
pub fn validate_config(config: &HeraldConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantics(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Validate a TOML string.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, Path::new("herald.toml"))
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            " at top level"
        } else {
            ""
        };
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field{level} (did you mean \"{s}\"?)"),
            None => format!("unknown field{level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            message,
        ));
    }
}

fn check_semantics(config: &HeraldConfig, diagnostics: &mut Vec<Diagnostic>) {
    let prefix = &config.bot.prefix;
    if prefix.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "bot.prefix",
            "prefix must not be empty or whitespace",
        ));
    } else if prefix.chars().any(char::is_whitespace) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "bot.prefix",
            "prefix must not contain whitespace",
        ));
    }

    if config.stream.refresh_interval_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "stream.refresh_interval_secs",
            "refresh interval must be at least one second",
        ));
    }

    if config.plugins.commands_dir == config.plugins.events_dir {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "plugins.events_dir",
            "commands and events must live in different directories",
        ));
    }

    if config.bootstrap.max_attempts == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "bootstrap.max_attempts",
            "0 attempts behaves like 1; the connection is never retried",
        ));
    }

    if config.bot.admins.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "semantic",
            "bot.admins",
            "no admins configured; admin commands are unreachable",
        ));
    }
}
