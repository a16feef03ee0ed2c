//! Error taxonomy for an embedding session.
//!
//! Every failure the interpreter can report is folded into one of three
//! classes (allocation, compile, runtime); host-side failures get their own
//! variants.  [`Error::from_lua`] is the single place where `mlua::Error`
//! values are classified.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigError;
use crate::session::SessionState;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which lifecycle step was running when an interpreter error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    RegisterLibraries,
    Compile,
    Run,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interpreter instance (or memory it needs) could not be allocated.
    #[error("cannot allocate interpreter: {0}")]
    Allocation(String),

    /// The chunk is not valid Lua; nothing was executed.
    #[error("{}", located(chunk, *line, message))]
    Compile {
        chunk: String,
        line: Option<u32>,
        message: String,
    },

    /// The chunk compiled but failed while running.
    #[error("{}", located(chunk, *line, message))]
    Runtime {
        chunk: String,
        line: Option<u32>,
        message: String,
        traceback: Option<String>,
    },

    /// The operation is not valid in the session's current state.
    #[error("cannot {op} while session is {state}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

impl Error {
    /// Classify an `mlua::Error` raised during `phase` of chunk `chunk`.
    pub fn from_lua(err: mlua::Error, phase: Phase, chunk: &str) -> Self {
        match (phase, err) {
            (Phase::Create | Phase::RegisterLibraries, e) => Error::Allocation(e.to_string()),
            (_, mlua::Error::SyntaxError { message, .. }) => {
                let (at, message) = split_location(&message);
                let (chunk, line) = reported_at(chunk, at);
                Error::Compile {
                    chunk,
                    line,
                    message,
                }
            }
            (Phase::Compile, mlua::Error::MemoryError(msg)) => Error::Allocation(msg),
            (_, mlua::Error::RuntimeError(msg)) | (_, mlua::Error::MemoryError(msg)) => {
                runtime(chunk, &msg)
            }
            (_, mlua::Error::CallbackError { traceback, cause }) => {
                let mut err = runtime(chunk, &cause.to_string());
                if let Error::Runtime { traceback: tb, .. } = &mut err {
                    tb.get_or_insert(traceback);
                }
                err
            }
            (_, other) => runtime(chunk, &other.to_string()),
        }
    }

    pub fn is_compile(&self) -> bool {
        matches!(self, Error::Compile { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::Runtime { .. })
    }

    pub fn is_allocation(&self) -> bool {
        matches!(self, Error::Allocation(_))
    }
}

fn runtime(chunk: &str, raw: &str) -> Error {
    let (head, traceback) = match raw.split_once("\nstack traceback:") {
        Some((head, tb)) => (head, Some(format!("stack traceback:{tb}"))),
        None => (raw, None),
    };
    let (at, message) = split_location(head);
    let (chunk, line) = reported_at(chunk, at);
    Error::Runtime {
        chunk,
        line,
        message,
        traceback,
    }
}

/// Chunk and line Lua reported; the executing chunk when there are none.
fn reported_at(executing: &str, at: Option<(String, u32)>) -> (String, Option<u32>) {
    match at {
        Some((chunk, line)) => (chunk, Some(line)),
        None => (executing.to_owned(), None),
    }
}

// `[string "name"]:3: msg`, `name:3: msg` or `file.lua:3: msg`
static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\[string "([^"]*)"\]|([^:\n]+)):(\d+): "#).expect("static regex")
});

/// Split Lua's `chunk:line:` prefix off an interpreter message.
fn split_location(msg: &str) -> (Option<(String, u32)>, String) {
    let Some(caps) = LOCATION.captures(msg) else {
        return (None, msg.to_owned());
    };
    let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
    let rest = msg[caps[0].len()..].to_owned();
    match caps[3].parse() {
        Ok(line) => (Some((name.to_owned(), line)), rest),
        Err(_) => (None, msg.to_owned()),
    }
}

fn located(chunk: &str, line: Option<u32>, message: &str) -> String {
    match line {
        Some(n) => format!("{chunk}:{n}: {message}"),
        None => format!("{chunk}: {message}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
