//! Application core: domain orchestration, no direct I/O.
//!
//! This module contains the business rules for the bin: the controller
//! that drives the FSM, the sequencer and the watchdog, plus the requests
//! it accepts and the events it emits.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
