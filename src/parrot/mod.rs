//! # Parrot Reaction Module
//!
//! The state machine that decides whether and how to answer a decoded packet,
//! and the MQTT server loop that feeds it:
//!
//! - [`dedup`] - TTL-bounded cache of already-seen packet ids
//! - [`engine`] - classification (direct / broadcast trigger) and the global
//!   reply throttle
//! - [`server`] - rumqttc transport loop, periodic node-info announcer, and
//!   paced reply publishing
//!
//! All reaction state is owned by the server task; inbound packets and timer
//! ticks are serialized through one `select!` loop, so no locks are needed.

pub mod dedup;
pub mod engine;
pub mod server;

pub use dedup::DedupCache;
pub use engine::{ParrotEngine, Reply};
pub use server::ParrotServer;

/// The activation token: a broadcast starting with 🦜 summons the parrot.
pub const TRIGGER: char = '\u{1F99C}';
