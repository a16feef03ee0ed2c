//! Where Lua's `print` goes.
//!
//! By default scripts print straight to the host's stdout through the
//! standard `print`.  In capture mode the global `print` is replaced with a
//! host function that formats its arguments the same way (each passed
//! through `tostring`, joined by tabs) and appends the line to an
//! [`OutputBuffer`].

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

/// Destination for script output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Stdout,
    Capture,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(OutputMode::Stdout),
            "capture" => Ok(OutputMode::Capture),
            other => Err(format!("unknown output mode '{other}' (expected stdout or capture)")),
        }
    }
}

/// Lines printed by scripts in capture mode.
///
/// Cheap to clone; all clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    lines: Rc<RefCell<Vec<String>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }

    /// Remove and return everything printed so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }

    /// Copy of the current contents, leaving the buffer untouched.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

/// Replace the global `print` with one that appends to `buffer`.
///
/// Must run after the base library is open.  The base `tostring` is taken
/// here, once, so `__tostring` metamethods apply and a script that reassigns
/// the global does not change how `print` formats.
pub(crate) fn install_capture(lua: &Lua, buffer: OutputBuffer) -> LuaResult<()> {
    let tostring: LuaFunction = lua.globals().get("tostring")?;
    let print = lua.create_function(move |_, args: LuaMultiValue| {
        let mut parts = Vec::with_capacity(args.len());
        for value in args {
            let s: LuaString = tostring.call(value)?;
            parts.push(s.to_string_lossy().to_string());
        }
        buffer.push(parts.join("\t"));
        Ok(())
    })?;
    lua.globals().set("print", print)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
