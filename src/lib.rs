//! Serial line latency monitor.
//!
//! - `serial`: port session, line framing, baud rates
//! - `timer`: latency timer state machine and formatting
//! - `session`: shared session context and the reader loop
//! - `app` / `ui`: iced application state and view

pub mod app;
pub mod error;
pub mod serial;
pub mod session;
pub mod settings;
pub mod timer;
mod ui;

pub use error::{Error, Result};
