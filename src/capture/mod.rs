//! Packet capture: decoded TCP segments and where they come from.

use std::collections::VecDeque;
use std::net::SocketAddrV4;

use bytes::Bytes;

use crate::error::CaptureError;
use crate::flow::ConnectionId;

pub mod decode;
pub mod pcap_source;

pub use decode::{decode_ethernet, decode_ipv4};
pub use pcap_source::PcapSource;

/// The IPv4/TCP fields of one captured segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpPacket {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub fin: bool,
    /// Raw TCP sequence number
    pub seq: u32,
    pub payload: Bytes,
}

impl TcpPacket {
    pub fn connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.src, self.dst)
    }

    /// Whether the segment is any use to the dispatcher.
    pub fn is_significant(&self) -> bool {
        self.fin || !self.payload.is_empty()
    }
}

/// A source of decoded packets, in capture order.
pub trait PacketSource {
    /// `Ok(None)` means the source is exhausted. Errors are fatal.
    fn next_packet(&mut self) -> Result<Option<TcpPacket>, CaptureError>;
}

/// Replays a fixed sequence of packets.
#[derive(Debug, Default, Clone)]
pub struct ReplaySource {
    packets: VecDeque<TcpPacket>,
}

impl ReplaySource {
    pub fn new(packets: impl IntoIterator<Item = TcpPacket>) -> Self {
        Self {
            packets: packets.into_iter().collect(),
        }
    }
}

impl PacketSource for ReplaySource {
    fn next_packet(&mut self) -> Result<Option<TcpPacket>, CaptureError> {
        Ok(self.packets.pop_front())
    }
}
