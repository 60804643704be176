use std::fmt;
use std::net::SocketAddrV4;

/// One directed TCP flow, identified by its 4-tuple.
///
/// The two directions of a connection are distinct identifiers: requests
/// and responses are reconstructed as independent streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
}

impl ConnectionId {
    pub fn new(src: SocketAddrV4, dst: SocketAddrV4) -> Self {
        Self { src, dst }
    }

    /// The identifier of the opposite direction of the same connection.
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }

    /// Directory-safe name, e.g. `10.0.0.1_51000-10.0.0.2_80`.
    pub fn dir_name(&self) -> String {
        format!(
            "{}_{}-{}_{}",
            self.src.ip(),
            self.src.port(),
            self.dst.ip(),
            self.dst.port()
        )
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}
