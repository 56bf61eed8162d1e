//! Core pipeline and domain logic for dailyvocab.
//!
//! This crate ties together word generation, deduplication, enrichment, and
//! the local checkpoint into one daily run (see [`pipeline::run_daily`]).

pub mod checkpoint;
pub mod completion;
pub mod dedup;
pub mod enrichment;
pub mod generator;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
mod testing;
