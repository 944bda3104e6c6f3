//! # netadmit
//!
//! A concurrent DHCP packet engine for network admission control.
//!
//! The engine owns the transport and concurrency layers of a DHCP-speaking
//! admission service: it binds UDP port 67, receives BOOTP/DHCP datagrams
//! into pooled buffers, validates them, fans them out to a bounded worker
//! pool and sends replies to the RFC 2131 destination. Policy - whether and
//! how to answer - lives behind the [`Handler`] trait supplied by the
//! embedding application.
//!
//! ## Features
//!
//! - Zero-copy packet access over pooled receive buffers
//! - Bounded worker pool with drop-on-full load shedding
//! - RFC 2131 reply addressing (relay, broadcast flag, limited broadcast)
//! - Handler panic isolation: one bad packet never stops the engine
//! - Pluggable transport for testing and interface-bound deployments
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use netadmit::{Config, MonitorHandler, Server, bind_dhcp_socket};
//!
//! #[tokio::main]
//! async fn main() -> netadmit::Result<()> {
//!     let config = Config::load_or_create("config.json")?;
//!     let socket = bind_dhcp_socket(&config)?;
//!     let server = Server::new(&config, socket, MonitorHandler);
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`Server`] - Dispatcher, worker pool and reply addressing
//! - [`Handler`] - The policy callback invoked per valid packet
//! - [`Packet`] - Zero-copy view over one BOOTP/DHCP datagram
//! - [`Options`] - Parsed option records per RFC 2132
//! - [`BufferPool`] - Reusable receive buffers
//! - [`PacketSocket`] - Datagram transport abstraction
//! - [`Config`] - Engine configuration (bind address, workers, queue)

pub mod config;
pub mod error;
pub mod handler;
pub mod options;
pub mod packet;
pub mod pool;
pub mod server;
pub mod socket;

pub use config::Config;
pub use error::{Error, Result};
pub use handler::{Handler, MonitorHandler};
pub use options::{MessageType, Options};
pub use packet::Packet;
pub use pool::{BufferPool, MAX_DATAGRAM_SIZE, PacketBuffer};
pub use server::{Server, ServerStats, reply_destination};
pub use socket::{PacketSocket, bind_dhcp_socket};
