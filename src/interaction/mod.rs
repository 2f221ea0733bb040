//! The event ingestion, command dispatch, and reply delivery pipeline.
//!
//! Three stages run concurrently and talk only through single-slot channels:
//! - `classifier` reads transport events and dispatches addressed commands
//! - `executor` runs commands from the `command` registry, one at a time
//! - `reply` posts each reply back to its conversation
//!
//! Each stage has one consumer, so replies leave in the order commands arrived.

pub mod classifier;
pub mod command;
pub mod executor;
pub mod reply;
