//! An embedding session: one Lua 5.4 state driven through a fixed lifecycle.
//!
//! ```text
//! create ─▶ Created ─▶ register_standard_library ─▶ LibrariesLoaded
//!                                                         │
//!                                       ┌─── execute ◀────┘
//!                                       ▼
//!                               Executing ⇄ Idle ─▶ close ─▶ Closed
//! ```
//!
//! [`Session::close`] takes the session by value, so nothing can be called
//! on it afterwards and it cannot be closed twice.  A session that goes out
//! of scope without `close` (early return, `?`, unwinding) releases its
//! interpreter in `Drop`.
//!
//! Compile and runtime errors leave the session `Idle`; further chunks may
//! run on the same interpreter.

use std::fmt;
use std::path::Path;

use mlua::prelude::*;
use mlua::{LuaOptions, StdLib};
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::config::SessionOptions;
use crate::error::{Error, Phase, Result};
use crate::output::{self, OutputBuffer, OutputMode};

// ── SessionState ──────────────────────────────────────────────────────────────

/// Lifecycle position of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Interpreter allocated, no libraries opened beyond the base library.
    Created,
    /// Standard library registered, nothing executed yet.
    LibrariesLoaded,
    /// A chunk is running.
    Executing,
    /// Between chunks, after at least one `execute` or `eval` returned.
    Idle,
    /// Interpreter released.
    Closed,
}

impl SessionState {
    fn can_execute(self) -> bool {
        matches!(self, SessionState::LibrariesLoaded | SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Created => "created",
            SessionState::LibrariesLoaded => "libraries-loaded",
            SessionState::Executing => "executing",
            SessionState::Idle => "idle",
            SessionState::Closed => "closed",
        })
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Exclusive owner of one Lua interpreter.
///
/// Not `Send`: an interpreter belongs to the thread that created it.
pub struct Session {
    lua: Lua,
    options: SessionOptions,
    state: SessionState,
    output: OutputBuffer,
    executions: u64,
}

impl Session {
    /// Allocate a fresh interpreter.
    ///
    /// Only the base library is open afterwards; call
    /// [`register_standard_library`](Self::register_standard_library)
    /// before executing anything.
    ///
    /// With a memory limit set, creation fails with [`Error::Allocation`]
    /// if the bare interpreter already needs more than the limit.
    pub fn create(options: SessionOptions) -> Result<Self> {
        let lua = Lua::new_with(StdLib::NONE, LuaOptions::default())
            .map_err(|e| Error::from_lua(e, Phase::Create, ""))?;

        if let Some(limit) = options.memory_limit {
            let used = lua.used_memory();
            if used > limit {
                return Err(Error::Allocation(format!(
                    "memory limit of {limit} bytes is below the {used} bytes a bare interpreter uses"
                )));
            }
            lua.set_memory_limit(limit)
                .map_err(|e| Error::from_lua(e, Phase::Create, ""))?;
        }

        debug!(
            used_memory = lua.used_memory(),
            memory_limit = ?options.memory_limit,
            "interpreter created"
        );

        Ok(Self {
            lua,
            options,
            state: SessionState::Created,
            output: OutputBuffer::new(),
            executions: 0,
        })
    }

    /// Open the configured standard libraries.
    ///
    /// Calling this again on the same session does nothing.
    pub fn register_standard_library(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            debug!(state = %self.state, "standard library already registered");
            return Ok(());
        }

        self.lua
            .load_std_libs(self.options.libs)
            .map_err(|e| Error::from_lua(e, Phase::RegisterLibraries, ""))?;

        if self.options.output == OutputMode::Capture {
            output::install_capture(&self.lua, self.output.clone())
                .map_err(|e| Error::from_lua(e, Phase::RegisterLibraries, ""))?;
        }

        self.state = SessionState::LibrariesLoaded;
        debug!(libs = ?self.options.libs, output = ?self.options.output, "standard library registered");
        Ok(())
    }

    /// Compile and run `chunk` to completion.
    ///
    /// A chunk that fails to compile never starts running.  Either kind of
    /// failure leaves the session usable.
    pub fn execute(&mut self, chunk: &Chunk) -> Result<()> {
        if !self.state.can_execute() {
            return Err(Error::InvalidState {
                op: "execute",
                state: self.state,
            });
        }

        let func = match self.lua.load(chunk.source()).set_name(chunk.chunkname()).into_function() {
            Ok(func) => func,
            Err(e) => {
                self.state = SessionState::Idle;
                let err = Error::from_lua(e, Phase::Compile, chunk.name());
                debug!(chunk = chunk.name(), error = %err, "chunk rejected");
                return Err(err);
            }
        };

        self.state = SessionState::Executing;
        let result = func.call::<()>(());
        self.state = SessionState::Idle;

        match result {
            Ok(()) => {
                self.executions += 1;
                debug!(chunk = chunk.name(), "chunk finished");
                Ok(())
            }
            Err(e) => {
                let err = Error::from_lua(e, Phase::Run, chunk.name());
                debug!(chunk = chunk.name(), error = %err, "chunk failed");
                Err(err)
            }
        }
    }

    /// Run an in-memory chunk reported as `name` in messages.
    pub fn exec_str(&mut self, name: &str, source: &str) -> Result<()> {
        self.execute(&Chunk::inline(name, source))
    }

    /// Read and run a script file.
    pub fn exec_file(&mut self, path: &Path) -> Result<()> {
        let chunk = Chunk::from_file(path)?;
        self.execute(&chunk)
    }

    /// Evaluate an expression and convert its value(s) to `R`.
    pub fn eval<R: FromLuaMulti>(&mut self, expr: &str) -> Result<R> {
        if !self.state.can_execute() {
            return Err(Error::InvalidState {
                op: "eval",
                state: self.state,
            });
        }
        self.state = SessionState::Executing;
        let result = self.lua.load(expr).set_name("=eval").eval::<R>();
        self.state = SessionState::Idle;
        result.map_err(|e| Error::from_lua(e, Phase::Run, "eval"))
    }

    /// Install the global `arg` table the way the standalone interpreter
    /// does: `arg[0]` is the script, positive indices its arguments, and
    /// `arg[-1]` the host program.
    pub fn set_script_args(&self, program: &str, script: &str, args: &[String]) -> Result<()> {
        let build = || -> LuaResult<()> {
            let arg = self.lua.create_table()?;
            arg.raw_set(-1, program)?;
            arg.raw_set(0, script)?;
            for (i, a) in args.iter().enumerate() {
                arg.raw_set(i as i64 + 1, a.as_str())?;
            }
            self.lua.globals().set("arg", arg)
        };
        build().map_err(|e| Error::from_lua(e, Phase::Run, "arg"))
    }

    /// Whether the global namespace currently defines `name`.
    pub fn has_global(&self, name: &str) -> Result<bool> {
        self.lua
            .globals()
            .contains_key(name)
            .map_err(|e| Error::from_lua(e, Phase::Run, "globals"))
    }

    /// Flush the stdio buffer behind `io.write`, if the io library is open.
    ///
    /// Captured `print` lines are written by the host, so the host flushes
    /// this first to keep both streams in order.
    pub fn flush_stdio(&self) -> Result<()> {
        let flush = || -> LuaResult<()> {
            let LuaValue::Table(io) = self.lua.globals().get::<LuaValue>("io")? else {
                return Ok(());
            };
            match io.get::<LuaValue>("stdout")? {
                LuaValue::UserData(stdout) => stdout.call_method::<()>("flush", ()),
                _ => Ok(()),
            }
        };
        flush().map_err(|e| Error::from_lua(e, Phase::Run, "io"))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Lines printed so far in [`OutputMode::Capture`]; always empty when
    /// printing to stdout.
    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Bytes currently held by the interpreter.
    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }

    /// Number of chunks that ran to completion.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Release the interpreter.
    pub fn close(mut self) {
        info!(
            executions = self.executions,
            used_memory = self.lua.used_memory(),
            "closing session"
        );
        self.state = SessionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            debug!(state = %self.state, "session dropped without close; releasing interpreter");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("executions", &self.executions)
            .finish_non_exhaustive()
    }
}

/// Drive a whole session for one chunk: create, register, execute, close.
///
/// The interpreter is released on every path once it has been created.
pub fn run(options: SessionOptions, chunk: &Chunk) -> Result<()> {
    let mut session = Session::create(options)?;
    session.register_standard_library()?;
    session.execute(chunk)?;
    session.close();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
