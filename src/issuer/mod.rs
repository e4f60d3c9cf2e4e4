//! Hint issuers
//!
//! A [`HintIssuer`] performs the speculative network action for one
//! `(address, method)` pair and reports success or failure. The scheduler
//! owns ordering and concurrency; issuers only do the I/O.

mod network;

pub use network::{HttpConfig, NetworkIssuer};

use async_trait::async_trait;
use thiserror::Error;

use crate::scheduler::Method;

#[derive(Debug, Error)]
pub enum HintError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("name resolution failed: {0}")]
    Resolve(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("issuer task failed: {0}")]
    Crashed(String),
}

pub type Result<T> = std::result::Result<T, HintError>;

/// One speculative action to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub address: String,
    pub method: Method,
}

impl Hint {
    pub fn new(address: impl Into<String>, method: Method) -> Self {
        Self {
            address: address.into(),
            method,
        }
    }
}

#[async_trait]
pub trait HintIssuer: Send + Sync {
    /// Perform the hint. Resolves once the hint has completed or failed.
    async fn issue(&self, hint: &Hint) -> Result<()>;
}

/// Issuer that only logs; every hint succeeds.
#[derive(Debug, Clone, Default)]
pub struct DryRunIssuer;

impl DryRunIssuer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HintIssuer for DryRunIssuer {
    async fn issue(&self, hint: &Hint) -> Result<()> {
        tracing::info!(address = %hint.address, method = %hint.method, "Dry-run hint");
        Ok(())
    }
}
