//! Default `tracing` initialisers for binaries/tests embedding [`crate::Engine`].
//!
//! Mirrors the teacher's `barter::logging::init_logging`/`init_json_logging`
//! pair: this is infrastructure every long-running deployment of the
//! trading core needs, not a CLI (spec.md's Non-goals exclude CLIs, not the
//! ambient logging setup the binary that embeds one would call).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise human-readable, env-filtered logging (`RUST_LOG`, defaulting
/// to `info`).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initialise structured JSON logging, for deployments that ship logs to a
/// collector rather than a terminal.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
