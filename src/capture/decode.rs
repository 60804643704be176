//! Ethernet / IPv4 / TCP header decoding of raw frames.

use std::net::SocketAddrV4;

use bytes::Bytes;
use etherparse::{EtherType, Ethernet2HeaderSlice, IpNumber, Ipv4HeaderSlice, TcpHeaderSlice};

use super::TcpPacket;

/// Decodes an Ethernet II frame. Anything other than an unfragmented
/// IPv4/TCP packet yields `None`.
pub fn decode_ethernet(frame: &[u8]) -> Option<TcpPacket> {
    let eth = Ethernet2HeaderSlice::from_slice(frame).ok()?;
    if eth.ether_type() != EtherType::IPV4 {
        return None;
    }
    decode_ipv4(&frame[eth.slice().len()..])
}

/// Decodes a bare IPv4 packet.
pub fn decode_ipv4(data: &[u8]) -> Option<TcpPacket> {
    let ip = Ipv4HeaderSlice::from_slice(data).ok()?;
    if ip.protocol() != IpNumber::TCP {
        return None;
    }
    if ip.more_fragments() || ip.fragments_offset().value() != 0 {
        return None;
    }

    let header_len = ip.slice().len();
    // Trailing link-layer padding is not payload. A zero total length
    // (segmentation offload) means "the rest of the capture".
    let end = match ip.total_len() as usize {
        0 => data.len(),
        total => total.clamp(header_len, data.len()),
    };
    let segment = &data[header_len..end];

    let tcp = TcpHeaderSlice::from_slice(segment).ok()?;
    let payload = &segment[tcp.slice().len()..];

    Some(TcpPacket {
        src: SocketAddrV4::new(ip.source_addr(), tcp.source_port()),
        dst: SocketAddrV4::new(ip.destination_addr(), tcp.destination_port()),
        fin: tcp.fin(),
        seq: tcp.sequence_number(),
        payload: Bytes::copy_from_slice(payload),
    })
}
