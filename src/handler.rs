//! The policy boundary.
//!
//! The engine validates and dispatches packets; what to answer is decided
//! by a [`Handler`] supplied by the embedding application - the admission
//! service's lease policy in production, scripted doubles in tests.

use tracing::info;

use crate::options::{MessageType, Options};
use crate::packet::Packet;

/// Per-packet policy callback.
///
/// Invoked concurrently from every worker, so implementations holding
/// state (a lease table, an admission database) must synchronize
/// internally. Returning `None` or an empty buffer sends nothing; a
/// non-empty buffer is written verbatim to the computed reply destination.
///
/// A panic inside `serve` is caught by the calling worker, logged and
/// counted; it never takes down the engine.
pub trait Handler: Send + Sync + 'static {
    fn serve(
        &self,
        packet: &Packet<'_>,
        message_type: MessageType,
        options: &Options<'_>,
    ) -> Option<Vec<u8>>;
}

impl<F> Handler for F
where
    F: Fn(&Packet<'_>, MessageType, &Options<'_>) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    fn serve(
        &self,
        packet: &Packet<'_>,
        message_type: MessageType,
        options: &Options<'_>,
    ) -> Option<Vec<u8>> {
        self(packet, message_type, options)
    }
}

/// Observe-only policy: logs every valid DHCP request and never replies.
///
/// The binary's default until an admission backend is wired in; useful for
/// watching what a network segment is asking for.
pub struct MonitorHandler;

impl Handler for MonitorHandler {
    fn serve(
        &self,
        packet: &Packet<'_>,
        message_type: MessageType,
        _options: &Options<'_>,
    ) -> Option<Vec<u8>> {
        info!(
            "{} from {} (xid {:08x}, relay {})",
            message_type,
            packet.format_mac(),
            packet.xid(),
            packet.giaddr()
        );
        None
    }
}
