//! Cumulative relations store.
//!
//! A single append-only file (`<name>.rels`, or `<name>.rels.gz` holding one
//! gzip member per batch). Appends are fsynced before any checkpoint refers to
//! them, and the file can be cut back to a checkpointed length on resume.

mod writer;

pub use writer::{Appended, BatchAppender, ResultStore, TrailingRecord};

#[cfg(test)]
mod tests;
