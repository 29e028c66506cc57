//! Range math and batch planning.
//!
//! Splits a q-range into per-worker sub-ranges and splits a whole run into
//! outer save-batches. Both follow the same rule: equal shares, the last one
//! absorbs the remainder.

mod range;

pub use range::{partition, save_batches, PartitionPlan, Range};
