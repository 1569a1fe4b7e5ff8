//! Smart recycling bin controller library.
//!
//! Exposes the sort-and-actuate core (debouncer, classification gate,
//! actuator sequencer, break-beam watchdog, challenge window and the
//! controller state machine) plus the host adapters, so the binary and
//! the integration tests share one module tree.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod frame;
pub mod fsm;
pub mod pins;
pub mod safety;
pub mod sensors;

pub use error::{Error, Result};
