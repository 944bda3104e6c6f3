//! DHCP option parsing per RFC 2132.
//!
//! The options region is a sequence of tag/length/value records terminated
//! by the end tag. [`Options`] walks the region once and exposes it as a
//! tag-to-bytes map; the engine itself only interprets the message type
//! (option 53), everything else is raw material for the policy handler.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Padding (no operation), skipped during parsing.
pub const OPTION_PAD: u8 = 0;
/// Client's requested IP address (RFC 2132 §9.1).
pub const OPTION_REQUESTED_IP: u8 = 50;
/// DHCP message type (RFC 2132 §9.6).
pub const OPTION_MESSAGE_TYPE: u8 = 53;
/// Server identifier (RFC 2132 §9.7).
pub const OPTION_SERVER_IDENTIFIER: u8 = 54;
/// Parameter request list (RFC 2132 §9.8).
pub const OPTION_PARAMETER_REQUEST_LIST: u8 = 55;
/// Client identifier (RFC 2132 §9.14).
pub const OPTION_CLIENT_IDENTIFIER: u8 = 61;
/// Relay agent information (RFC 3046).
pub const OPTION_RELAY_AGENT_INFO: u8 = 82;
/// End of options marker.
pub const OPTION_END: u8 = 255;

/// DHCP message types (option 53) as defined in RFC 2132 §9.6.
///
/// A packet without this option, or with a value outside 1..=8, is not a
/// valid DHCP packet and is discarded before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageType {
    /// Client broadcast to locate servers.
    Discover = 1,
    /// Server response to DISCOVER with IP offer.
    Offer = 2,
    /// Client request for offered parameters.
    Request = 3,
    /// Client indicates address is already in use.
    Decline = 4,
    /// Server acknowledgement with configuration.
    Ack = 5,
    /// Server negative acknowledgement.
    Nak = 6,
    /// Client releases IP address.
    Release = 7,
    /// Client requests config without IP allocation.
    Inform = 8,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Discover),
            2 => Ok(Self::Offer),
            3 => Ok(Self::Request),
            4 => Ok(Self::Decline),
            5 => Ok(Self::Ack),
            6 => Ok(Self::Nak),
            7 => Ok(Self::Release),
            8 => Ok(Self::Inform),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover => write!(f, "DISCOVER"),
            Self::Offer => write!(f, "OFFER"),
            Self::Request => write!(f, "REQUEST"),
            Self::Decline => write!(f, "DECLINE"),
            Self::Ack => write!(f, "ACK"),
            Self::Nak => write!(f, "NAK"),
            Self::Release => write!(f, "RELEASE"),
            Self::Inform => write!(f, "INFORM"),
        }
    }
}

/// Options of one packet, parsed once, keyed by option tag.
///
/// Values borrow the packet buffer; an `Options` never outlives the buffer
/// it was parsed from. The first occurrence of a tag wins.
#[derive(Debug)]
pub struct Options<'a> {
    entries: HashMap<u8, &'a [u8]>,
}

impl<'a> Options<'a> {
    /// Walks the TLV records in `region` until the end tag or the end of
    /// the region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`] if a record declares more data than
    /// the region holds, or a tag has no length byte.
    pub fn parse(region: &'a [u8]) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut index = 0;

        while index < region.len() {
            let tag = region[index];

            if tag == OPTION_PAD {
                index += 1;
                continue;
            }

            if tag == OPTION_END {
                break;
            }

            if index + 1 >= region.len() {
                return Err(Error::InvalidPacket("Option length missing".to_string()));
            }

            let length = region[index + 1] as usize;

            if index + 2 + length > region.len() {
                return Err(Error::InvalidPacket("Option data truncated".to_string()));
            }

            let value = &region[index + 2..index + 2 + length];
            entries.entry(tag).or_insert(value);

            index += 2 + length;
        }

        Ok(Self { entries })
    }

    /// The raw value of `tag`, if present.
    pub fn get(&self, tag: u8) -> Option<&'a [u8]> {
        self.entries.get(&tag).copied()
    }

    /// The DHCP message type (option 53), if present and in range.
    pub fn message_type(&self) -> Option<MessageType> {
        let value = self.get(OPTION_MESSAGE_TYPE)?;
        if value.len() != 1 {
            return None;
        }
        MessageType::try_from(value[0]).ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
