//! Messages between the render loop and the simulation worker.
//!
//! The render loop keeps at most one [`SimRequest`] in flight. Elapsed time
//! that accrues while a request is outstanding is folded into the next one.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Ask the simulation to advance by `elapsed` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimRequest {
    /// Sequence number, increasing by one per request.
    pub sequence: u64,
    /// Accumulated real time since the last completed step, in seconds.
    pub elapsed: f32,
}

/// Completed step returned by the simulation worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimResponse {
    /// Sequence number of the request this answers.
    pub sequence: u64,
    /// Resulting world state.
    pub snapshot: Snapshot,
}
