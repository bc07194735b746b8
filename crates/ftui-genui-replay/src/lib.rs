#![forbid(unsafe_code)]

//! Diagnostics harness for the generative-UI pipeline.
//!
//! Replays a recorded model response as if it were streaming, printing what
//! the pipeline shows after each delta, and exposes the extraction and
//! mindmap layout stages on their own.

pub mod cli;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod profile;
pub mod replay;
pub mod settings;

pub use cli::run_from_env;
pub use error::{ReplayError, Result};
