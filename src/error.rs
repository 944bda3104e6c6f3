//! Error types for the packet engine.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.
//!
//! Only transport-fatal conditions (a failed socket read) ever escape
//! [`Server::run`](crate::Server::run). Malformed packets, overload drops,
//! reply-write failures and handler panics are absorbed locally and surface
//! through logging and the server's counters.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    ///
    /// When returned from [`Server::run`](crate::Server::run) this means the
    /// receive socket failed and the engine has shut down.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed DHCP packet.
    ///
    /// Produced by the options parser for truncated or inconsistent TLV
    /// records. Never propagated out of the worker that hit it.
    #[error("Invalid DHCP packet: {0}")]
    InvalidPacket(String),

    /// Invalid engine configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate) when the
    /// configuration contains invalid values (e.g., zero workers).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without administrator
    /// privileges.
    #[error("Socket error: {0}")]
    Socket(String),

    /// Worker-pool failure.
    ///
    /// The job queue closed while the dispatcher was still accepting
    /// packets, meaning every worker exited early.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// A specialized Result type for packet-engine operations.
pub type Result<T> = std::result::Result<T, Error>;
