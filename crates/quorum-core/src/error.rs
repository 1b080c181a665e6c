// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Error types for Quorum.

use thiserror::Error;

/// A specialized `Result` type for Quorum core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A gossip tag carried a value that could not be decoded.
    #[error("invalid tag {key}={value:?}")]
    InvalidTag {
        /// The tag key.
        key: &'static str,
        /// The raw tag value.
        value: String,
    },

    /// Logging could not be initialized.
    #[error("logging error: {0}")]
    Logging(String),
}

impl Error {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
