//! Pure, deterministic engine logic: command parsing, handler-source
//! sanitization, and the shared conversation/state types. No I/O.

pub mod parser;
pub mod sanitize;
pub mod types;
