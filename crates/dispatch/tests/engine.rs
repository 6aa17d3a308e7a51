#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    tempfile::TempDir,
    tokio_util::sync::CancellationToken,
};

use {
    herald_channels::{
        DataStore, Transport,
        memory::{MemoryDataStore, MemoryTransport},
    },
    herald_common::types::{MessageKind, RawMessage, ThreadInfo, UserProfile},
    herald_dispatch::{
        AccessDenied, AccessPolicy, DispatchEngine, EngineConfig, Outcome, StreamState,
        StreamSupervisor,
    },
    herald_plugins::{
        BuiltinCatalog, CommandContext, CommandHandler, EventContext, EventHandler, PluginHost,
        PluginLoader,
    },
};

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

struct Record {
    journal: Arc<Journal>,
}

#[async_trait]
impl CommandHandler for Record {
    async fn on_message(&self, ctx: &EventContext) -> anyhow::Result<()> {
        self.journal.push(format!("observe:{}", ctx.message.body()));
        Ok(())
    }

    async fn on_call(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        self.journal.push(format!(
            "call:{}:{}:{}",
            ctx.module.name,
            ctx.invoked,
            ctx.args.join(",")
        ));
        ctx.reply(&format!("ran {}", ctx.module.name)).await?;
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl CommandHandler for Broken {
    async fn on_call(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
        anyhow::bail!("handler exploded")
    }
}

struct Watch {
    journal: Arc<Journal>,
    fail: bool,
}

#[async_trait]
impl EventHandler for Watch {
    async fn on_message(&self, ctx: &EventContext) -> anyhow::Result<()> {
        self.journal.push(format!("event:{}", ctx.message.kind()));
        if self.fail {
            anyhow::bail!("event module exploded");
        }
        Ok(())
    }
}

fn catalog(journal: &Arc<Journal>) -> BuiltinCatalog {
    let mut catalog = BuiltinCatalog::bundled();
    let j = Arc::clone(journal);
    catalog.register_command("record", move || {
        Arc::new(Record {
            journal: Arc::clone(&j),
        })
    });
    catalog.register_command("broken", || Arc::new(Broken));
    let j = Arc::clone(journal);
    catalog.register_event("watch", move || {
        Arc::new(Watch {
            journal: Arc::clone(&j),
            fail: false,
        })
    });
    let j = Arc::clone(journal);
    catalog.register_event("failing-watch", move || {
        Arc::new(Watch {
            journal: Arc::clone(&j),
            fail: true,
        })
    });
    catalog
}

struct Bot {
    dir: TempDir,
    transport: Arc<MemoryTransport>,
    data: Arc<MemoryDataStore>,
    engine: Arc<DispatchEngine>,
    journal: Arc<Journal>,
}

impl Bot {
    fn write(&self, kind: &str, file: &str, manifest: &str) {
        write(self.dir.path(), kind, file, manifest);
    }

    async fn say(&self, body: &str) -> Outcome {
        self.say_in("t1", "100", body).await
    }

    async fn say_in(&self, thread: &str, sender: &str, body: &str) -> Outcome {
        self.engine.dispatch(raw(thread, sender, body)).await
    }

    fn replies(&self) -> Vec<String> {
        self.transport.sent().into_iter().map(|m| m.content).collect()
    }
}

fn write(root: &Path, kind: &str, file: &str, manifest: &str) {
    let dir = root.join(kind);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), manifest).unwrap();
}

fn raw(thread: &str, sender: &str, body: &str) -> RawMessage {
    RawMessage {
        kind: MessageKind::Message,
        sender_id: sender.into(),
        thread_id: thread.into(),
        body: body.into(),
        message_id: format!("m-{body}"),
        reply_to: None,
        is_group: true,
        timestamp: 1,
    }
}

async fn bot(commands: &[(&str, &str)], events: &[(&str, &str)], policy: AccessPolicy) -> Bot {
    let dir = tempfile::tempdir().unwrap();
    for (file, manifest) in commands {
        write(dir.path(), "commands", file, manifest);
    }
    for (file, manifest) in events {
        write(dir.path(), "events", file, manifest);
    }

    let journal = Arc::new(Journal::default());
    let transport = Arc::new(MemoryTransport::new("bot"));
    for (id, name) in [("100", "Alice"), ("200", "Bob")] {
        transport.add_user(UserProfile {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        });
    }
    for id in ["t1", "nsfw-room"] {
        transport.add_thread(ThreadInfo {
            id: id.into(),
            is_group: true,
            ..Default::default()
        });
    }
    let data = Arc::new(MemoryDataStore::new());

    let loader = PluginLoader::new(
        dir.path().join("commands"),
        dir.path().join("events"),
        Arc::new(catalog(&journal)),
    );
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let host = Arc::new(PluginHost::new(loader, Arc::clone(&dyn_transport)));
    let report = host.load().await;
    assert!(report.is_clean(), "{:?}", report.errors);

    let config = EngineConfig {
        policy,
        ..EngineConfig::default()
    };
    let engine = Arc::new(DispatchEngine::new(config, host, dyn_transport, data.clone()));
    Bot {
        dir,
        transport,
        data,
        engine,
        journal,
    }
}

const ECHO: (&str, &str) = (
    "echo.toml",
    "name = \"echo\"\nalias = [\"E\", \"say\"]\nbuiltin = \"record\"",
);

#[tokio::test]
async fn prefixed_alias_runs_the_command_with_args() {
    let bot = bot(&[ECHO], &[], AccessPolicy::default()).await;

    assert_eq!(bot.say("!e hello world").await, Outcome::Executed {
        command: "echo".into()
    });
    assert!(
        bot.journal
            .take()
            .contains(&"call:echo:e:hello,world".to_string())
    );
    assert_eq!(bot.replies(), vec!["ran echo"]);
}

#[tokio::test]
async fn unprefixed_call_only_runs_nopre_commands() {
    let hi = ("hi.toml", "name = \"hi\"\nnopre = true\nbuiltin = \"record\"");
    let bot = bot(&[ECHO, hi], &[], AccessPolicy::default()).await;

    assert_eq!(bot.say("echo bar").await, Outcome::Ignored);
    assert_eq!(bot.say("hi there").await, Outcome::Executed {
        command: "hi".into()
    });
    assert_eq!(bot.replies(), vec!["ran hi"]);
}

#[tokio::test(start_paused = true)]
async fn cooldown_sends_one_notice_per_window() {
    let ping = (
        "ping.toml",
        "name = \"ping\"\nalias = [\"p\"]\nwait = 5\nbuiltin = \"record\"",
    );
    let bot = bot(&[ping], &[], AccessPolicy::default()).await;

    assert_eq!(bot.say("!ping").await, Outcome::Executed {
        command: "ping".into()
    });

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(bot.say("!p").await, Outcome::Throttled {
        command: "ping".into(),
        notified: true,
    });
    for _ in 0..3 {
        assert_eq!(bot.say("!ping").await, Outcome::Throttled {
            command: "ping".into(),
            notified: false,
        });
    }
    assert_eq!(bot.replies(), vec![
        "ran ping",
        "Please wait 3.0s before using ping again."
    ]);
    let sent = bot.transport.sent();
    assert_eq!(sent[0].reply_to.as_deref(), Some("m-!ping"));
    assert_eq!(sent[1].thread_id, "t1");
    assert_eq!(sent[1].reply_to, None);

    // Another user is not affected.
    assert!(matches!(
        bot.say_in("t1", "200", "!ping").await,
        Outcome::Executed { .. }
    ));

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(matches!(bot.say("!ping").await, Outcome::Executed { .. }));
    // The notice is re-armed for the new window.
    assert!(matches!(
        bot.say("!ping").await,
        Outcome::Throttled { notified: true, .. }
    ));
}

#[tokio::test]
async fn nsfw_commands_only_run_in_listed_threads() {
    let spicy = (
        "spicy.toml",
        "name = \"spicy\"\ncategory = \"nsfw\"\nbuiltin = \"record\"",
    );
    let policy = AccessPolicy {
        admins: Vec::new(),
        nsfw_threads: vec!["nsfw-*".into()],
    };
    let bot = bot(&[spicy], &[], policy).await;

    assert_eq!(bot.say("!spicy").await, Outcome::Denied {
        command: "spicy".into(),
        reason: AccessDenied::NsfwThread,
    });
    assert!(!bot.journal.take().iter().any(|e| e.starts_with("call:")));
    assert_eq!(bot.replies(), vec!["spicy is not allowed in this thread."]);
    assert_eq!(bot.transport.sent()[0].reply_to, None);

    assert!(matches!(
        bot.say_in("nsfw-room", "100", "!spicy").await,
        Outcome::Executed { .. }
    ));
}

#[tokio::test]
async fn admin_commands_need_a_listed_sender() {
    let purge = (
        "purge.toml",
        "name = \"purge\"\nadmin = true\nbuiltin = \"record\"",
    );
    let policy = AccessPolicy {
        admins: vec!["100".into()],
        nsfw_threads: Vec::new(),
    };
    let bot = bot(&[purge], &[], policy).await;

    assert_eq!(bot.say_in("t1", "200", "!purge").await, Outcome::Denied {
        command: "purge".into(),
        reason: AccessDenied::NotAdmin,
    });
    assert!(matches!(bot.say("!purge").await, Outcome::Executed { .. }));
}

#[tokio::test]
async fn unknown_prefixed_word_goes_to_the_fallback_without_gating() {
    let unknown = (
        "unknown.toml",
        "name = \"unknown\"\nfallback = true\nadmin = true\nbuiltin = \"unknown\"",
    );
    let bot = bot(&[ECHO, unknown], &[], AccessPolicy::default()).await;

    assert_eq!(bot.say("!dance now").await, Outcome::Executed {
        command: "unknown".into()
    });
    assert_eq!(bot.replies(), vec![
        "Unknown command \"dance\". Send !help for a list."
    ]);

    // Without the prefix nothing happens.
    assert_eq!(bot.say("dance").await, Outcome::Ignored);
}

#[tokio::test]
async fn failing_modules_do_not_stop_siblings_or_resolution() {
    let events = [
        ("a.toml", "name = \"a-failing\"\nbuiltin = \"failing-watch\""),
        ("b.toml", "name = \"b-watch\"\nbuiltin = \"watch\""),
    ];
    let broken = ("broken.toml", "name = \"broken\"\nbuiltin = \"broken\"");
    let bot = bot(&[ECHO, broken], &events, AccessPolicy::default()).await;

    assert_eq!(bot.say("!echo hi").await, Outcome::Executed {
        command: "echo".into()
    });
    assert_eq!(bot.journal.take(), vec![
        "observe:!echo hi",
        "event:message",
        "event:message",
        "call:echo:echo:hi",
    ]);

    assert_eq!(bot.say("!broken").await, Outcome::Failed {
        command: "broken".into()
    });
    // The engine keeps going after a failed command.
    assert!(matches!(bot.say("!echo again").await, Outcome::Executed { .. }));
}

#[tokio::test]
async fn every_event_is_recorded_and_fanned_out() {
    let events = [("watch.toml", "name = \"watch\"\nbuiltin = \"watch\"")];
    let bot = bot(&[ECHO], &events, AccessPolicy::default()).await;

    let mut typing = raw("t1", "100", "");
    typing.kind = MessageKind::Typing;
    assert_eq!(bot.engine.dispatch(typing).await, Outcome::Ignored);
    assert_eq!(bot.say("").await, Outcome::Ignored);

    assert_eq!(bot.journal.take(), vec![
        "observe:",
        "event:typing",
        "observe:",
        "event:message",
    ]);
    let user = bot.data.get_user("100").await.unwrap().unwrap();
    assert_eq!(user.message_count, 2);
}

#[tokio::test]
async fn reload_reflects_edits_and_clears_cooldowns() {
    let slow = (
        "slow.toml",
        "name = \"slow\"\nwait = 600\nbuiltin = \"record\"",
    );
    let bot = bot(&[slow], &[], AccessPolicy::default()).await;

    assert!(matches!(bot.say("!slow").await, Outcome::Executed { .. }));
    assert!(matches!(bot.say("!slow").await, Outcome::Throttled { .. }));

    bot.write(
        "commands",
        "slow.toml",
        "name = \"slow\"\nalias = [\"s\"]\nwait = 600\nbuiltin = \"record\"",
    );
    let report = bot.engine.reload().await;
    assert_eq!(report.commands, vec!["slow"]);
    assert!(bot.engine.cooldowns().is_empty());

    assert!(matches!(bot.say("!s").await, Outcome::Executed { .. }));
}

#[tokio::test]
async fn reload_command_reloads_from_chat() {
    let reload = (
        "reload.toml",
        "name = \"reload\"\nadmin = true\nbuiltin = \"reload\"",
    );
    let policy = AccessPolicy {
        admins: vec!["100".into()],
        nsfw_threads: Vec::new(),
    };
    let bot = bot(&[reload], &[], policy).await;
    assert_eq!(bot.say("!echo").await, Outcome::Ignored);

    let (file, manifest) = ECHO;
    bot.write("commands", file, manifest);
    assert!(matches!(bot.say("!reload").await, Outcome::Executed { .. }));
    assert_eq!(bot.replies(), vec!["Reloaded 2 commands and 0 events (0 errors)."]);
    assert!(matches!(bot.say("!say hi").await, Outcome::Executed { .. }));
}

#[tokio::test]
async fn supervised_stream_feeds_the_engine() {
    let bot = bot(&[ECHO], &[], AccessPolicy::default()).await;
    let mut outbound = bot.transport.watch_outbound();

    let transport: Arc<dyn Transport> = bot.transport.clone();
    let supervisor = Arc::new(StreamSupervisor::new(
        transport,
        bot.engine.clone(),
        Duration::from_secs(3600),
    ));
    let mut state = supervisor.state();
    let cancel = CancellationToken::new();
    let task = {
        let supervisor = Arc::clone(&supervisor);
        let cancel = cancel.clone();
        tokio::spawn(async move { supervisor.run(None, cancel).await })
    };
    state
        .wait_for(|s| *s == StreamState::Listening)
        .await
        .unwrap();

    assert!(bot.transport.inject(raw("t1", "100", "!echo live")));
    let sent = outbound.recv().await.unwrap();
    assert_eq!(sent.content, "ran echo");
    assert_eq!(sent.thread_id, "t1");
    assert_eq!(sent.reply_to.as_deref(), Some("m-!echo live"));

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(bot.transport.active_subscriptions(), 0);
}
