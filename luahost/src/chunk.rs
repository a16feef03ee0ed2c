//! Script sources handed to a session.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Source for the greeting run when the binary is given nothing else to do.
pub const GREETING: &str = "print('Hello, World! (from Lua)')";

/// One piece of Lua source plus the name it is compiled under.
///
/// The name follows Lua's chunkname convention: `=name` is shown verbatim
/// in messages, `@path` marks a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    chunkname: String,
    source: String,
}

impl Chunk {
    /// An in-memory chunk reported as `name` in error messages.
    pub fn inline(name: impl AsRef<str>, source: impl Into<String>) -> Self {
        Self {
            chunkname: format!("={}", name.as_ref()),
            source: source.into(),
        }
    }

    /// Read a script file.  A leading `#` line (shebang) is blanked so that
    /// line numbers in messages still match the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            chunkname: format!("@{}", path.display()),
            source: strip_shebang(source),
        })
    }

    /// Read the whole of standard input as one chunk.
    pub fn from_stdin() -> Result<Self> {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .map_err(|source| Error::Io {
                path: "stdin".into(),
                source,
            })?;
        Ok(Self {
            chunkname: "=stdin".to_owned(),
            source: strip_shebang(source),
        })
    }

    /// Chunkname as passed to the interpreter.
    pub fn chunkname(&self) -> &str {
        &self.chunkname
    }

    /// Name without the `=`/`@` marker, for host-side messages.
    pub fn name(&self) -> &str {
        self.chunkname
            .strip_prefix(['=', '@'])
            .unwrap_or(&self.chunkname)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn strip_shebang(source: String) -> String {
    if !source.starts_with('#') {
        return source;
    }
    match source.find('\n') {
        Some(nl) => source[nl..].to_owned(),
        None => String::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
