use proptest::prelude::*;

use netadmit::{Packet, reply_destination};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const DHCP_FIXED_HEADER_SIZE: usize = 240;

fn valid_header() -> Vec<u8> {
    let mut packet = vec![0u8; DHCP_FIXED_HEADER_SIZE];
    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
    packet
}

fn parse_all(data: &[u8]) {
    if let Some(packet) = Packet::new(data) {
        let _ = packet.op();
        let _ = packet.xid();
        let _ = packet.flags();
        let _ = packet.giaddr();
        let _ = packet.chaddr();
        let _ = packet.format_mac();
        let _ = packet.options();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    #[test]
    fn accessors_never_panic_on_arbitrary_bytes(data: Vec<u8>) {
        parse_all(&data);
    }

    #[test]
    fn accessors_never_panic_on_valid_header_with_random_options(
        options_data in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut packet = valid_header();
        packet.extend_from_slice(&options_data);
        parse_all(&packet);
    }

    #[test]
    fn accessors_never_panic_on_corrupted_header(
        corrupted_bytes in prop::collection::vec(any::<u8>(), 240..600),
        corruption_indices in prop::collection::vec(0usize..240, 1..10),
        corruption_values in prop::collection::vec(any::<u8>(), 1..10)
    ) {
        let mut packet = corrupted_bytes;
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
        for (index, value) in corruption_indices.iter().zip(corruption_values.iter()) {
            if *index < packet.len() {
                packet[*index] = *value;
            }
        }
        parse_all(&packet);
    }

    #[test]
    fn accessors_never_panic_on_random_option_lengths(
        option_code in 1u8..254,
        option_length in any::<u8>(),
        option_data in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        let mut packet = valid_header();
        packet.push(option_code);
        packet.push(option_length);
        let actual_len = (option_length as usize).min(option_data.len());
        packet.extend_from_slice(&option_data[..actual_len]);
        packet.push(255);
        parse_all(&packet);
    }

    #[test]
    fn chaddr_never_panics_on_arbitrary_hlen(hlen in any::<u8>()) {
        let mut packet = valid_header();
        packet[2] = hlen;
        let view = Packet::new(&packet).unwrap();
        prop_assert!(view.chaddr().len() <= 16);
    }

    #[test]
    fn short_packets_always_rejected(
        data in prop::collection::vec(any::<u8>(), 0..240)
    ) {
        prop_assert!(Packet::new(&data).is_none());
    }

    #[test]
    fn bad_magic_cookie_always_fails_options(
        cookie in any::<[u8; 4]>()
    ) {
        prop_assume!(cookie != DHCP_MAGIC_COOKIE);

        let mut packet = valid_header();
        packet[236..240].copy_from_slice(&cookie);
        packet.push(255);

        let view = Packet::new(&packet).unwrap();
        prop_assert!(view.options().is_err());
    }

    #[test]
    fn relayed_replies_always_go_to_the_source(
        relay in any::<[u8; 4]>(),
        source_ip in any::<[u8; 4]>(),
        source_port in any::<u16>(),
        flags in any::<u16>(),
    ) {
        prop_assume!(relay != [0, 0, 0, 0]);

        let mut packet = valid_header();
        packet[10..12].copy_from_slice(&flags.to_be_bytes());
        packet[24..28].copy_from_slice(&relay);

        let view = Packet::new(&packet).unwrap();
        let source = SocketAddr::new(IpAddr::V4(Ipv4Addr::from(source_ip)), source_port);
        prop_assert_eq!(reply_destination(&view, source), source);
    }

    #[test]
    fn direct_replies_preserve_the_source_port(
        source_ip in any::<[u8; 4]>(),
        source_port in any::<u16>(),
        flags in any::<u16>(),
    ) {
        let mut packet = valid_header();
        packet[10..12].copy_from_slice(&flags.to_be_bytes());

        let view = Packet::new(&packet).unwrap();
        let source = SocketAddr::new(IpAddr::V4(Ipv4Addr::from(source_ip)), source_port);
        let destination = reply_destination(&view, source);
        prop_assert_eq!(destination.port(), source_port);

        // without a relay the reply is either unicast to the source or
        // limited broadcast, never a third address
        let broadcast = IpAddr::V4(Ipv4Addr::BROADCAST);
        prop_assert!(destination.ip() == source.ip() || destination.ip() == broadcast);
    }
}
