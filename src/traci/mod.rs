//! Minimal TraCI client for driving a SUMO process over TCP.

mod client;
pub mod codec;
pub mod constants;
mod launch;

use std::io;

use thiserror::Error;

pub use client::TraciClient;
pub use launch::{LaunchOptions, SumoProcess, launch, sumo_bin};

/// Errors raised while talking to SUMO.
#[derive(Debug, Error)]
pub enum TraciError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Protocol(String),

    #[error("command 0x{command:02x} failed: {description}")]
    Command { command: u8, description: String },

    #[error("expected type 0x{expected:02x}, got 0x{actual:02x}")]
    UnexpectedType { expected: u8, actual: u8 },

    #[error("failed to start {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("no TraCI server on port {port} after {attempts} attempts")]
    ConnectTimeout { port: u16, attempts: u32 },
}
