//! HTTP message boundary detection.
//!
//! This module turns a reconstructed TCP byte stream into a sequence of
//! HTTP start-line events. It does not parse messages fully: headers other
//! than `Content-Length` are ignored and bodies are skipped.
//!
//! # Architecture
//!
//! - **`segmenter`**: the line-scanning state machine over a `ByteStream`
//! - **`parser`**: classifies a single line (request line, status line, ...)
//! - **`request`**: request start line and method representation
//! - **`response`**: response status line representation
//! - **`event`**: the events handed to consumers
//!
//! # Example
//!
//! ```
//! use httptap::http::{HttpEvent, HttpSegmenter};
//! use httptap::stream::MemoryStream;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let stream = MemoryStream::new(&b"HTTP/1.1 204 No Content\r\n\r\n"[..]);
//! let events = HttpSegmenter::new(stream).collect().await?;
//!
//! assert!(matches!(&events[0], HttpEvent::Response(r) if r.status_code() == Some(204)));
//! # Ok(())
//! # }
//! ```

pub mod event;
pub mod parser;
pub mod request;
pub mod response;
pub mod segmenter;

pub use event::{FlowEvent, HttpEvent};
pub use segmenter::{HttpSegmenter, SegmenterState};
