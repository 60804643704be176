//! httptap - passive HTTP observer
//!
//! Rebuilds TCP byte streams from captured packets and reports the HTTP
//! request and response start lines found in them.

pub mod capture;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod http;
pub mod store;
pub mod stream;
