//! CSV ingestion of the input tables, TOML configuration loading, and
//! atomic output writers. Depends on `sched-core` only — no solver
//! dependency; this crate turns bytes on disk into `sched_core::Data` and
//! back into bytes on disk.

pub mod atomic;
pub mod config;
pub mod input;
pub mod output;
