//! # Meshparrot - an MQTT parrot for Meshtastic mesh networks
//!
//! Meshparrot is an automated participant on a Meshtastic channel bridged over
//! MQTT. It listens to every ServiceEnvelope on the channel topic, decrypts
//! packets with the shared channel key, and emits throttled automatic replies:
//! direct messages are echoed back prefixed with `PARROT:`, and a broadcast
//! that starts with the 🦜 trigger token gets a 🦜 back.
//!
//! ## Features
//!
//! - **Wire Compatibility**: prost-generated Meshtastic protobufs (ServiceEnvelope,
//!   MeshPacket, Data, User) with upstream field numbers.
//! - **Channel Cipher**: AES-128/256-CTR with the Meshtastic nonce layout
//!   (packet id ‖ sender node number, both little-endian u64).
//! - **Replay Suppression**: TTL-bounded dedup cache keyed by packet id, so the
//!   bot reacts at most once per packet no matter how many gateways relay it.
//! - **Reply Pacing**: a single global throttle plus a deliberate pre-send delay
//!   keeps the bot from flooding the mesh when several peers answer at once.
//! - **Async Design**: one Tokio task owns all reaction state; inbound traffic
//!   and the periodic node-info announcer are serialized through one loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshparrot::config::Config;
//! use meshparrot::parrot::ParrotServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = ParrotServer::new(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`mesh`] - Packet codec: identity, channel hash, cipher, envelope encode/decode
//! - [`parrot`] - Reaction engine, dedup cache, and the MQTT server loop
//! - [`config`] - Configuration management and validation
//! - [`protobuf`] - Generated Meshtastic protobuf types
//!
//! ## Data Flow
//!
//! ```text
//! MQTT subscribe ──> Codec::decode ──> ParrotEngine::on_message
//!                     (AES-CTR)              │
//! MQTT publish  <── Codec::encode <── paced reply (tokio task)
//! ```

pub mod config;
pub mod logutil;
pub mod mesh;
pub mod parrot;
pub mod protobuf;
