//! libpcap-backed packet sources: a live device or a savefile.

use std::path::Path;

use pcap::{Activated, Active, Capture, Linktype, Offline};

use super::{PacketSource, TcpPacket, decode_ethernet, decode_ipv4};
use crate::config::Config;
use crate::error::CaptureError;

/// Framing of the bytes libpcap hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkLayer {
    Ethernet,
    RawIp,
    Unsupported(i32),
}

impl From<Linktype> for LinkLayer {
    fn from(link: Linktype) -> Self {
        match link.0 {
            1 => LinkLayer::Ethernet,
            // DLT_RAW (both historical values) and LINKTYPE_IPV4
            12 | 101 | 228 => LinkLayer::RawIp,
            other => LinkLayer::Unsupported(other),
        }
    }
}

pub struct PcapSource<T: Activated + ?Sized> {
    capture: Capture<T>,
    link: LinkLayer,
}

impl PcapSource<Active> {
    /// Opens `cfg.device` for live capture with the configured filter.
    pub fn open_live(cfg: &Config) -> Result<Self, CaptureError> {
        let capture = Capture::from_device(cfg.device.as_str())
            .and_then(|inactive| {
                inactive
                    .promisc(cfg.promiscuous)
                    .snaplen(cfg.snapshot_len)
                    .timeout(cfg.read_timeout_ms)
                    .open()
            })
            .map_err(|source| CaptureError::Open {
                device: cfg.device.clone(),
                source,
            })?;

        tracing::info!(
            device = %cfg.device,
            snaplen = cfg.snapshot_len,
            promiscuous = cfg.promiscuous,
            "Capture device opened"
        );
        Self::with_filter(capture, cfg)
    }
}

impl PcapSource<Offline> {
    /// Replays a pcap savefile with the configured filter.
    pub fn open_file(path: &Path, cfg: &Config) -> Result<Self, CaptureError> {
        let capture = Capture::from_file(path).map_err(|source| CaptureError::Open {
            device: path.display().to_string(),
            source,
        })?;

        tracing::info!(file = %path.display(), "Capture file opened");
        Self::with_filter(capture, cfg)
    }
}

impl<T: Activated + ?Sized> PcapSource<T> {
    fn with_filter(mut capture: Capture<T>, cfg: &Config) -> Result<Self, CaptureError> {
        let filter = cfg.capture_filter();
        capture
            .filter(&filter, true)
            .map_err(|source| CaptureError::Filter {
                filter: filter.clone(),
                source,
            })?;

        let link = LinkLayer::from(capture.get_datalink());
        if let LinkLayer::Unsupported(code) = link {
            tracing::warn!(link_type = code, "Unsupported link type, no packets will decode");
        }
        tracing::debug!(%filter, ?link, "Capture filter applied");

        Ok(Self { capture, link })
    }
}

impl<T: Activated + ?Sized> PacketSource for PcapSource<T> {
    fn next_packet(&mut self) -> Result<Option<TcpPacket>, CaptureError> {
        loop {
            let decoded = match self.capture.next_packet() {
                Ok(packet) => match self.link {
                    LinkLayer::Ethernet => decode_ethernet(packet.data),
                    LinkLayer::RawIp => decode_ipv4(packet.data),
                    LinkLayer::Unsupported(_) => None,
                },
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(CaptureError::Read(e)),
            };

            if let Some(packet) = decoded {
                return Ok(Some(packet));
            }
        }
    }
}
