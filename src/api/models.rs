//! Request and response bodies for the hint API.
//!
//! ```json
//! POST /links/scan     {"addresses": ["https://site.test/about", "https://cdn.test/app.js"]}
//! POST /links/signal   {"address": "https://site.test/about", "signal": "hover_enter"}
//! POST /resources/abort {"address": "https://site.test/about"}
//! PUT  /network        {"effective_type": "3g", "save_data": false}
//! ```
//!
//! Scan responses are [`ScanReport`]s; resource listings are
//! [`ResourceSnapshot`](crate::scheduler::ResourceSnapshot)s in scheduling order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::links::{ConnectionInfo, GateReason, Signal, SignalOutcome};
use crate::scheduler::AbortOutcome;

pub use crate::links::ScanReport;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanRequest {
    pub addresses: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalRequest {
    pub address: String,
    pub signal: Signal,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignalResponse {
    pub address: String,
    pub outcome: SignalOutcome,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AbortRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AbortResponse {
    pub address: String,
    pub outcome: AbortOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkResponse {
    pub connection: ConnectionInfo,
    /// Present while scans and viewport boosts are refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gated: Option<GateReason>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub scheduler_id: Uuid,
    pub max_concurrency: usize,
    pub active_slots: usize,
    pub resources: usize,
    pub version: String,
}
