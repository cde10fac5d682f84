//! Process-wide logging setup for ledger services and tests.

pub mod subscriber;

pub use subscriber::{LOG_FORMAT_VAR, LogFormat, init, init_with};
