//! Message dispatch: command resolution, cooldowns, access gating and the
//! supervised inbound stream.
//!
//! Pipeline per inbound event:
//! 1. Enrich conversational events with sender and thread metadata
//! 2. Record activity in the data store
//! 3. Fan out to every command's and event module's `on_message`
//! 4. Resolve the body to a command (or the fallback)
//! 5. Cooldown, then category gate, then admin gate
//! 6. Run the command's `on_call`

pub mod cooldown;
pub mod engine;
pub mod error;
pub mod gate;
pub mod resolve;
pub mod supervisor;

pub use {
    cooldown::{CooldownDecision, CooldownLedger},
    engine::{DispatchEngine, EngineConfig, Outcome},
    error::{Error, Result},
    gate::{AccessDenied, AccessPolicy, Notices},
    resolve::{Invocation, Resolution},
    supervisor::{DEFAULT_REFRESH_INTERVAL, InboundSink, StreamState, StreamSupervisor},
};
