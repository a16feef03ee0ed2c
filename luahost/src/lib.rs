//! Host-side embedding of a Lua 5.4 interpreter.
//!
//! A [`Session`] owns one interpreter and walks it through
//! create → register standard library → execute (any number of times) →
//! close.  Failures come back as [`Error`]: allocation, compile, or runtime.
//!
//! ```no_run
//! use luahost::{Chunk, Session, SessionOptions};
//!
//! let mut session = Session::create(SessionOptions::default())?;
//! session.register_standard_library()?;
//! session.execute(&Chunk::inline("hello", "print('Hello, World!')"))?;
//! session.close();
//! # Ok::<(), luahost::Error>(())
//! ```

pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod session;

pub use chunk::Chunk;
pub use config::SessionOptions;
pub use error::{Error, Result};
pub use output::{OutputBuffer, OutputMode};
pub use session::{run, Session, SessionState};
