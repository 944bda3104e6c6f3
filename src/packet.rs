//! Zero-copy view over a raw DHCP/BOOTP packet per RFC 2131.
//!
//! A DHCP packet consists of a fixed 236-byte header followed by a 4-byte
//! magic cookie and variable-length options. [`Packet`] exposes the header
//! fields of an already-received buffer without copying; it borrows the
//! buffer and must not be retained past one receive cycle.
//!
//! # Packet Structure
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     op (1)    |   htype (1)   |   hlen (1)    |   hops (1)    |
//! +---------------+---------------+---------------+---------------+
//! |                            xid (4)                            |
//! +-------------------------------+-------------------------------+
//! |           secs (2)            |           flags (2)           |
//! +-------------------------------+-------------------------------+
//! |                          ciaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          yiaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          siaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          giaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          chaddr (16)                          |
//! +---------------------------------------------------------------+
//! |                          sname (64)                           |
//! +---------------------------------------------------------------+
//! |                          file (128)                           |
//! +---------------------------------------------------------------+
//! |                    magic cookie (4) = 99.130.83.99            |
//! +---------------------------------------------------------------+
//! |                          options (variable)                   |
//! +---------------------------------------------------------------+
//! ```
//!
//! # References
//!
//! - RFC 2131: Dynamic Host Configuration Protocol

use std::net::Ipv4Addr;

use crate::error::Result;
use crate::options::Options;

/// DHCP magic cookie that identifies DHCP packets (vs BOOTP).
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const XID_OFFSET: usize = 4;
const SECS_OFFSET: usize = 8;
const FLAGS_OFFSET: usize = 10;
const CIADDR_OFFSET: usize = 12;
const YIADDR_OFFSET: usize = 16;
const SIADDR_OFFSET: usize = 20;
const GIADDR_OFFSET: usize = 24;
const CHADDR_OFFSET: usize = 28;
const MAGIC_COOKIE_OFFSET: usize = 236;
const OPTIONS_OFFSET: usize = MAGIC_COOKIE_OFFSET + MAGIC_COOKIE.len();

/// Minimum valid packet: fixed header plus magic cookie.
///
/// Anything shorter cannot be DHCP and is dropped before dispatch.
pub const MIN_PACKET_SIZE: usize = OPTIONS_OFFSET;

/// The chaddr field is 16 bytes; a declared hardware-address length
/// above this is malformed.
pub const MAX_HW_ADDR_LEN: usize = 16;

/// Broadcast bit in the flags field.
const FLAG_BROADCAST: u16 = 0x8000;

/// BOOTP/DHCP operation code for client requests.
pub const BOOTREQUEST: u8 = 1;

/// BOOTP/DHCP operation code for server replies.
pub const BOOTREPLY: u8 = 2;

/// A read-only view over the valid bytes of a received DHCP packet.
///
/// Construction only checks the minimum length; all accessors are then
/// in-bounds by construction. Option-level validity (magic cookie, TLV
/// structure, message type) is checked by [`options`](Self::options).
#[derive(Clone, Copy, Debug)]
pub struct Packet<'a> {
    data: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Wraps `data` if it is long enough to hold the fixed header.
    pub fn new(data: &'a [u8]) -> Option<Self> {
        (data.len() >= MIN_PACKET_SIZE).then_some(Self { data })
    }

    /// Operation code: [`BOOTREQUEST`] (1) or [`BOOTREPLY`] (2).
    pub fn op(&self) -> u8 {
        self.data[0]
    }

    /// Hardware address type (1 = Ethernet).
    pub fn htype(&self) -> u8 {
        self.data[1]
    }

    /// Declared hardware address length.
    pub fn hlen(&self) -> u8 {
        self.data[2]
    }

    /// Hop count, incremented by relay agents.
    pub fn hops(&self) -> u8 {
        self.data[3]
    }

    /// Transaction ID chosen by the client, echoed in replies.
    pub fn xid(&self) -> u32 {
        u32::from_be_bytes(self.array_at(XID_OFFSET))
    }

    /// Seconds elapsed since the client began address acquisition.
    pub fn secs(&self) -> u16 {
        u16::from_be_bytes([self.data[SECS_OFFSET], self.data[SECS_OFFSET + 1]])
    }

    /// Flags field. Bit 15 (0x8000) is the broadcast flag.
    pub fn flags(&self) -> u16 {
        u16::from_be_bytes([self.data[FLAGS_OFFSET], self.data[FLAGS_OFFSET + 1]])
    }

    /// Client IP address (set by clients in RENEWING/REBINDING states).
    pub fn ciaddr(&self) -> Ipv4Addr {
        self.ipv4_at(CIADDR_OFFSET)
    }

    /// "Your" IP address - the address a server is assigning.
    pub fn yiaddr(&self) -> Ipv4Addr {
        self.ipv4_at(YIADDR_OFFSET)
    }

    /// Server IP address.
    pub fn siaddr(&self) -> Ipv4Addr {
        self.ipv4_at(SIADDR_OFFSET)
    }

    /// Relay agent IP address. Unspecified (0.0.0.0) means the packet
    /// came directly from the client.
    pub fn giaddr(&self) -> Ipv4Addr {
        self.ipv4_at(GIADDR_OFFSET)
    }

    /// Client hardware address, clamped to the declared `hlen`.
    pub fn chaddr(&self) -> &'a [u8] {
        let len = (self.hlen() as usize).min(MAX_HW_ADDR_LEN);
        &self.data[CHADDR_OFFSET..CHADDR_OFFSET + len]
    }

    /// True if the client asked for broadcast replies.
    ///
    /// Clients that cannot yet receive unicast traffic set this bit.
    pub fn is_broadcast(&self) -> bool {
        (self.flags() & FLAG_BROADCAST) != 0
    }

    /// True if the magic cookie identifies this as DHCP rather than BOOTP.
    pub fn has_magic_cookie(&self) -> bool {
        self.data[MAGIC_COOKIE_OFFSET..OPTIONS_OFFSET] == MAGIC_COOKIE
    }

    /// The raw options region (everything after the magic cookie).
    pub fn options_region(&self) -> &'a [u8] {
        &self.data[OPTIONS_OFFSET..]
    }

    /// Parses the options region into an [`Options`] map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`](crate::Error::InvalidPacket) if the
    /// magic cookie is wrong or a TLV record is truncated.
    pub fn options(&self) -> Result<Options<'a>> {
        if !self.has_magic_cookie() {
            return Err(crate::Error::InvalidPacket(
                "Invalid magic cookie".to_string(),
            ));
        }
        Options::parse(self.options_region())
    }

    /// The underlying bytes this view covers.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Formats the client hardware address as a colon-separated string.
    ///
    /// For Ethernet, returns format like "aa:bb:cc:dd:ee:ff".
    pub fn format_mac(&self) -> String {
        use std::fmt::Write;
        let chaddr = self.chaddr();
        let mut result = String::with_capacity(chaddr.len() * 3);
        for (index, byte) in chaddr.iter().enumerate() {
            if index > 0 {
                result.push(':');
            }
            let _ = write!(result, "{:02x}", byte);
        }
        result
    }

    fn ipv4_at(&self, offset: usize) -> Ipv4Addr {
        Ipv4Addr::from(self.array_at::<4>(offset))
    }

    fn array_at<const N: usize>(&self, offset: usize) -> [u8; N] {
        self.data[offset..offset + N]
            .try_into()
            .expect("offset within fixed header")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MessageType, OPTION_END, OPTION_MESSAGE_TYPE};

    fn base_packet() -> Vec<u8> {
        let mut data = vec![0u8; 300];
        data[0] = BOOTREQUEST;
        data[1] = 1;
        data[2] = 6;
        data[4..8].copy_from_slice(&0x12345678u32.to_be_bytes());
        data[10..12].copy_from_slice(&0x8000u16.to_be_bytes());
        data[28..34].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        data[236..240].copy_from_slice(&MAGIC_COOKIE);
        data[240] = OPTION_MESSAGE_TYPE;
        data[241] = 1;
        data[242] = MessageType::Discover as u8;
        data[243] = OPTION_END;
        data
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(Packet::new(&[0u8; 0]).is_none());
        assert!(Packet::new(&[0u8; 100]).is_none());
        assert!(Packet::new(&[0u8; MIN_PACKET_SIZE - 1]).is_none());
        assert!(Packet::new(&[0u8; MIN_PACKET_SIZE]).is_some());
    }

    #[test]
    fn field_offsets_are_correct() {
        let mut data = vec![0u8; MIN_PACKET_SIZE + 1];
        data[0] = BOOTREQUEST;
        data[1] = 1;
        data[2] = 6;
        data[3] = 5;
        data[4..8].copy_from_slice(&0xDEADBEEFu32.to_be_bytes());
        data[8..10].copy_from_slice(&1234u16.to_be_bytes());
        data[10..12].copy_from_slice(&0x8000u16.to_be_bytes());
        data[12..16].copy_from_slice(&[10, 0, 0, 1]);
        data[16..20].copy_from_slice(&[10, 0, 0, 2]);
        data[20..24].copy_from_slice(&[10, 0, 0, 3]);
        data[24..28].copy_from_slice(&[10, 0, 0, 4]);
        data[28..34].copy_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        data[236..240].copy_from_slice(&MAGIC_COOKIE);
        data[240] = OPTION_END;

        let packet = Packet::new(&data).unwrap();
        assert_eq!(packet.op(), BOOTREQUEST);
        assert_eq!(packet.htype(), 1);
        assert_eq!(packet.hlen(), 6);
        assert_eq!(packet.hops(), 5);
        assert_eq!(packet.xid(), 0xDEADBEEF);
        assert_eq!(packet.secs(), 1234);
        assert_eq!(packet.flags(), 0x8000);
        assert_eq!(packet.ciaddr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(packet.yiaddr(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(packet.siaddr(), Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(packet.giaddr(), Ipv4Addr::new(10, 0, 0, 4));
        assert_eq!(packet.chaddr(), &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        assert!(packet.has_magic_cookie());
    }

    #[test]
    fn broadcast_flag() {
        let mut data = base_packet();
        let packet = Packet::new(&data).unwrap();
        assert!(packet.is_broadcast());

        data[10..12].copy_from_slice(&0x0000u16.to_be_bytes());
        let packet = Packet::new(&data).unwrap();
        assert!(!packet.is_broadcast());
    }

    #[test]
    fn chaddr_respects_hlen() {
        let mut data = base_packet();
        data[2] = 4;
        let packet = Packet::new(&data).unwrap();
        assert_eq!(packet.chaddr(), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn chaddr_clamps_oversized_hlen() {
        let mut data = base_packet();
        data[2] = 200;
        let packet = Packet::new(&data).unwrap();
        assert_eq!(packet.chaddr().len(), MAX_HW_ADDR_LEN);
    }

    #[test]
    fn format_mac() {
        let data = base_packet();
        let packet = Packet::new(&data).unwrap();
        assert_eq!(packet.format_mac(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn bad_cookie_fails_options_parse() {
        let mut data = base_packet();
        data[236..240].copy_from_slice(&[0, 0, 0, 0]);
        let packet = Packet::new(&data).unwrap();
        assert!(!packet.has_magic_cookie());
        assert!(packet.options().is_err());
    }

    #[test]
    fn options_parse_finds_message_type() {
        let data = base_packet();
        let packet = Packet::new(&data).unwrap();
        let options = packet.options().unwrap();
        assert_eq!(options.message_type(), Some(MessageType::Discover));
    }

    #[test]
    fn empty_options_region_is_valid() {
        let mut data = vec![0u8; MIN_PACKET_SIZE];
        data[0] = BOOTREQUEST;
        data[236..240].copy_from_slice(&MAGIC_COOKIE);
        let packet = Packet::new(&data).unwrap();
        let options = packet.options().unwrap();
        assert!(options.is_empty());
        assert_eq!(options.message_type(), None);
    }
}
