//! Transport-facing seams of the dispatch runtime.
//!
//! The chat backend is an opaque collaborator: it implements [`Transport`]
//! for sending, reacting, profile lookups and the inbound event stream, and
//! [`DataStore`] for durable user/thread data. Everything above this crate
//! talks to the backend only through these traits.

pub mod error;
pub mod gating;
pub mod memory;
pub mod message;
pub mod store;
pub mod transport;

pub use {
    error::{Error, Result},
    message::InboundMessage,
    store::{DataStore, ThreadRecord, UserRecord},
    transport::{Subscription, Transport},
};
