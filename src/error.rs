//! Error types for httptap.
//!
//! Every error here is scoped to a single connection except `CaptureError`,
//! which means the packet source itself is gone.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the on-disk fragment store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The connection directory could not be created
    #[error("could not create flow directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment could not be written; that fragment is lost
    #[error("could not write fragment {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The connection directory could not be listed
    #[error("could not list flow directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The connection directory could not be removed
    #[error("could not remove flow directory {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal failures while materializing one connection's byte stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("could not read fragment {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the packet source. These end the process.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("could not open capture device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: pcap::Error,
    },

    #[error("could not apply capture filter {filter:?}: {source}")]
    Filter {
        filter: String,
        #[source]
        source: pcap::Error,
    },

    #[error("capture read failed: {0}")]
    Read(#[from] pcap::Error),
}
