/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with a custom lookup, so tests never touch
/// the process environment.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut placeholder = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                placeholder.push(c);
            }
            if !closed || placeholder.is_empty() {
                // Malformed, emit literally.
                result.push_str("${");
                result.push_str(&placeholder);
                if closed {
                    result.push('}');
                }
                continue;
            }

            let (name, default) = match placeholder.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (placeholder.as_str(), None),
            };
            // With a default, an empty variable counts as unset.
            match (lookup(name), default) {
                (Some(value), Some(default)) if value.is_empty() => result.push_str(default),
                (Some(value), _) => result.push_str(&value),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    result.push_str("${");
                    result.push_str(&placeholder);
                    result.push('}');
                },
            }
        } else {
            result.push(ch);
        }
    }

    result
}
