//! Connection identity and the registry of currently open flows.

pub mod id;
pub mod registry;

pub use id::ConnectionId;
pub use registry::FlowRegistry;
