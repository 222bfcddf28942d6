//! # Frame Synchronization
//!
//! The renderer never waits on the simulation. It keeps drawing the last
//! known snapshot while at most one step request is outstanding.
//!
//! ```text
//! frame:     1     2     3     4     5
//! request:   [ step 1 in flight ]  [ step 2 ...
//! elapsed:   +dt   +dt   +dt   -> coalesced into step 2
//! ```

mod coalesce;

pub use coalesce::StepCoalescer;
