//! Datagram socket abstraction.
//!
//! The engine reads and writes through [`PacketSocket`] rather than a
//! concrete UDP socket, so tests can substitute a scripted double and
//! deployments can substitute an interface-bound socket.
//!
//! Implementations must support `send_to` from multiple workers
//! concurrently. UDP sockets do; if a substituted transport does not,
//! wrap it so that writes are serialized behind a single writer.

use std::io;
use std::net::{SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

/// Abstract datagram transport consumed by the engine.
#[async_trait]
pub trait PacketSocket: Send + Sync {
    /// Receives one datagram into `buf`, returning the byte count and the
    /// source address.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Sends `buf` as one datagram to `target`.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
}

#[async_trait]
impl PacketSocket for UdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }
}

/// Binds the DHCP server socket described by `config`.
///
/// The socket gets `SO_REUSEADDR` for quick rebinding and `SO_BROADCAST`
/// because replies to clients without an address go to 255.255.255.255.
pub fn bind_dhcp_socket(config: &Config) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|error| Error::Socket(format!("Failed to create socket: {}", error)))?;

    socket
        .set_reuse_address(true)
        .map_err(|error| Error::Socket(format!("Failed to set SO_REUSEADDR: {}", error)))?;

    socket
        .set_broadcast(true)
        .map_err(|error| Error::Socket(format!("Failed to set SO_BROADCAST: {}", error)))?;

    socket
        .set_nonblocking(true)
        .map_err(|error| Error::Socket(format!("Failed to set non-blocking: {}", error)))?;

    let bind_addr = SocketAddrV4::new(config.bind_address, config.port);
    socket
        .bind(&bind_addr.into())
        .map_err(|error| Error::Socket(format!("Failed to bind to {}: {}", bind_addr, error)))?;

    let std_socket: std::net::UdpSocket = socket.into();
    let tokio_socket = UdpSocket::from_std(std_socket)
        .map_err(|error| Error::Socket(format!("Failed to convert to tokio socket: {}", error)))?;

    info!("DHCP socket bound to {}", bind_addr);

    Ok(tokio_socket)
}
