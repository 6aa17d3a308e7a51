//! Turning a message body into a command invocation.

use std::sync::Arc;

use herald_plugins::{CommandModule, Registry};

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// First token, lower-cased.
    pub command: String,
    pub args: Vec<String>,
    /// Whether the body started with the configured prefix.
    pub has_prefix: bool,
}

/// Split `body` into command and arguments.
///
/// Returns `None` for a body with no tokens. A body that is just the
/// prefix yields an empty command name, which only the fallback can match.
pub fn parse(body: &str, prefix: &str) -> Option<Invocation> {
    let (rest, has_prefix) = match body.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() => (rest, true),
        _ => (body, false),
    };

    let mut tokens = rest.split_whitespace();
    let command = match tokens.next() {
        Some(token) => token.to_lowercase(),
        None if has_prefix => String::new(),
        None => return None,
    };

    Some(Invocation {
        command,
        args: tokens.map(str::to_string).collect(),
        has_prefix,
    })
}

/// How an invocation maps onto the registry.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A registered command matched.
    Command(Arc<CommandModule>),
    /// Nothing matched a prefixed invocation; the fallback takes it.
    Fallback(Arc<CommandModule>),
    /// Nothing matched and no fallback applies.
    NotFound,
    /// The command exists but needs the prefix, which was not given.
    PrefixRequired,
}

pub fn resolve(registry: &Registry, invocation: &Invocation) -> Resolution {
    match registry.command(&invocation.command) {
        Some(module) if invocation.has_prefix || module.nopre => {
            Resolution::Command(Arc::clone(module))
        },
        Some(_) => Resolution::PrefixRequired,
        None if invocation.has_prefix => match registry.fallback() {
            Some(fallback) => Resolution::Fallback(Arc::clone(fallback)),
            None => Resolution::NotFound,
        },
        None => Resolution::NotFound,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        herald_plugins::{CommandContext, CommandHandler},
        rstest::rstest,
    };

    #[rstest]
    #[case("!foo bar baz", "foo", &["bar", "baz"], true)]
    #[case("!FOO  Bar", "foo", &["Bar"], true)]
    #[case("!  spaced out", "spaced", &["out"], true)]
    #[case("foo bar", "foo", &["bar"], false)]
    #[case("  Hello\tworld ", "hello", &["world"], false)]
    #[case("!", "", &[], true)]
    fn parses_bodies(
        #[case] body: &str,
        #[case] command: &str,
        #[case] args: &[&str],
        #[case] has_prefix: bool,
    ) {
        let invocation = parse(body, "!").unwrap();
        assert_eq!(invocation, Invocation {
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            has_prefix,
        });
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_bodies_do_not_parse(#[case] body: &str) {
        assert_eq!(parse(body, "!"), None);
    }

    #[test]
    fn multi_character_prefix() {
        let invocation = parse(">>ping now", ">>").unwrap();
        assert_eq!(invocation.command, "ping");
        assert!(invocation.has_prefix);
        assert!(!parse(">ping", ">>").unwrap().has_prefix);
    }

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn on_call(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn build_registry(with_fallback: bool) -> Registry {
        let mut registry = Registry::new();
        registry.register_command(CommandModule::new("ping", Arc::new(Noop)).with_alias("p"));
        registry.register_command(CommandModule::new("hi", Arc::new(Noop)).without_prefix());
        if with_fallback {
            registry.register_command(CommandModule::new("unknown", Arc::new(Noop)).as_fallback());
        }
        registry
    }

    fn resolve_body(registry: &Registry, body: &str) -> Resolution {
        resolve(registry, &parse(body, "!").unwrap())
    }

    #[test]
    fn prefixed_alias_resolves() {
        let registry = build_registry(false);
        let Resolution::Command(module) = resolve_body(&registry, "!P") else {
            panic!("expected a command");
        };
        assert_eq!(module.name, "ping");
    }

    #[test]
    fn unprefixed_call_needs_nopre() {
        let registry = build_registry(true);
        assert!(matches!(resolve_body(&registry, "ping"), Resolution::PrefixRequired));
        assert!(matches!(resolve_body(&registry, "hi there"), Resolution::Command(_)));
        assert!(matches!(resolve_body(&registry, "!hi"), Resolution::Command(_)));
    }

    #[test]
    fn unknown_prefixed_word_goes_to_fallback() {
        let registry = build_registry(true);
        let Resolution::Fallback(module) = resolve_body(&registry, "!dance") else {
            panic!("expected the fallback");
        };
        assert_eq!(module.name, "unknown");
        assert!(matches!(resolve_body(&registry, "dance"), Resolution::NotFound));
        assert!(matches!(resolve_body(&build_registry(false), "!dance"), Resolution::NotFound));
    }
}
