//! Marker-protocol autonomous agent engine.
//!
//! A language model drives a turn-based loop: each assistant turn may carry
//! one command between two sentinel glyphs, the engine executes it in an
//! isolated child process, and the result is appended to the conversation
//! for the next turn. The model can also extend its own command set at
//! runtime by authoring new handler scripts, which are sanitized and
//! persisted before they become invocable.
//!
//! The crate enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (command parsing, source
//!   sanitization, shared types). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting seams (child processes, handler registry,
//!   model transport, configuration, workspace files). Isolated behind
//!   small surfaces to enable scripting in tests.
//!
//! Orchestration modules ([`dispatch`], [`synthesis`], [`looping`])
//! coordinate core logic with I/O to implement the session loop.

pub mod core;
pub mod dispatch;
pub mod io;
pub mod logging;
pub mod looping;
pub mod synthesis;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
