//! Console transport: stdin lines become inbound messages and outbound
//! messages are printed to stdout.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use {
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        sync::broadcast,
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    herald_channels::memory::{MemoryTransport, SentMessage},
    herald_common::types::{MessageKind, RawMessage, ThreadInfo, UserProfile},
    herald_config::ConsoleConfig,
};

pub const SELF_ID: &str = "herald";

/// In-memory transport seeded with the console user and thread.
pub fn transport(config: &ConsoleConfig) -> Arc<MemoryTransport> {
    let transport = Arc::new(MemoryTransport::new(SELF_ID));
    transport.add_user(UserProfile {
        id: config.user_id.clone(),
        name: config.user_name.clone(),
        first_name: Some(config.user_name.clone()),
        ..Default::default()
    });
    transport.add_thread(ThreadInfo {
        id: config.thread_id.clone(),
        name: Some("console".into()),
        participant_ids: vec![config.user_id.clone(), SELF_ID.to_string()],
        ..Default::default()
    });
    transport
}

/// Turns typed lines into raw messages from the console user.
pub struct LineReader {
    sender_id: String,
    thread_id: String,
    next_id: AtomicU64,
}

impl LineReader {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            sender_id: config.user_id.clone(),
            thread_id: config.thread_id.clone(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn message(&self, line: &str) -> RawMessage {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        RawMessage {
            kind: MessageKind::Message,
            sender_id: self.sender_id.clone(),
            thread_id: self.thread_id.clone(),
            body: line.to_string(),
            message_id: format!("console-{id}"),
            reply_to: None,
            is_group: false,
            timestamp: now_millis(),
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Feed stdin into `transport` until EOF or cancellation.
pub fn spawn_input(
    transport: Arc<MemoryTransport>,
    reader: LineReader,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if !transport.inject(reader.message(&line)) {
                        warn!("stream not listening, dropped console line");
                    }
                },
                Ok(None) => {
                    info!("console input closed; press Ctrl-C to stop");
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "failed to read console input");
                    break;
                },
            }
        }
    })
}

/// Print everything the bot sends until cancellation.
pub fn spawn_output(transport: &MemoryTransport, cancel: CancellationToken) -> JoinHandle<()> {
    let mut outbound = transport.watch_outbound();
    tokio::spawn(async move {
        loop {
            let sent = tokio::select! {
                () = cancel.cancelled() => break,
                sent = outbound.recv() => sent,
            };
            match sent {
                Ok(sent) => println!("{}", render(&sent)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "console output lagged");
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn render(sent: &SentMessage) -> String {
    let mut out = String::new();
    for (i, line) in sent.content.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let marker = if i == 0 {
            format!("[{}] {SELF_ID}>", sent.thread_id)
        } else {
            " ".repeat(sent.thread_id.len() + SELF_ID.len() + 3)
        };
        out.push_str(&marker);
        out.push(' ');
        out.push_str(line);
    }
    out
}
