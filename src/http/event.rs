use std::fmt;

use super::request::RequestStart;
use super::response::ResponseStart;
use crate::flow::ConnectionId;

/// Something the segmenter recognised in a reconstructed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpEvent {
    Request(RequestStart),
    Response(ResponseStart),
}

impl fmt::Display for HttpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpEvent::Request(req) => write!(f, "{} {} {}", req.method, req.target, req.version),
            HttpEvent::Response(resp) => write!(f, "{} {}", resp.version, resp.status),
        }
    }
}

/// An event tagged with the flow it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEvent {
    pub flow: ConnectionId,
    pub event: HttpEvent,
}
