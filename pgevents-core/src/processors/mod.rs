//! Background processing for a listener.
//!
//! - `EventLoop`: receives transport signals, dispatches to the callback registry

pub mod event_loop;

pub use event_loop::{EventLoop, PROBE_INTERVAL};
