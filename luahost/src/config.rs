//! Session options and the `luahostrc` file that can preset them.
//!
//! The rc file uses the same directive style as the command line of the host:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set an option |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Recognised options: `libs`, `memory_limit`, `output`.

use std::path::Path;

use mlua::StdLib;

use crate::output::OutputMode;

// ── Options ───────────────────────────────────────────────────────────────────

/// How a session's interpreter is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Libraries opened by `register_standard_library`.
    pub libs: StdLib,
    /// Cap on interpreter heap, in bytes.  `None` means unlimited.
    pub memory_limit: Option<usize>,
    pub output: OutputMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            libs: StdLib::ALL_SAFE,
            memory_limit: None,
            output: OutputMode::Stdout,
        }
    }
}

impl SessionOptions {
    /// Set one option by name, as written in an rc file.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "libs" => self.libs = parse_libs(value)?,
            "memory_limit" => self.memory_limit = Some(parse_size(value)?).filter(|&n| n != 0),
            "output" => self.output = value.parse()?,
            other => return Err(format!("unknown option '{other}'")),
        }
        Ok(())
    }
}

/// Parse a library list: `all`, `none`, or names joined by commas.
///
/// The base library is always opened and is not named here.  `debug` is
/// never available.
pub fn parse_libs(s: &str) -> Result<StdLib, String> {
    let s = s.trim();
    match s {
        "all" => return Ok(StdLib::ALL_SAFE),
        "none" | "" => return Ok(StdLib::NONE),
        _ => {}
    }
    s.split(',')
        .map(str::trim)
        .try_fold(StdLib::NONE, |acc, name| {
            let lib = match name {
                "coroutine" => StdLib::COROUTINE,
                "table" => StdLib::TABLE,
                "io" => StdLib::IO,
                "os" => StdLib::OS,
                "string" => StdLib::STRING,
                "utf8" => StdLib::UTF8,
                "math" => StdLib::MATH,
                "package" => StdLib::PACKAGE,
                "debug" => return Err("the debug library is not available".to_owned()),
                other => return Err(format!("unknown library '{other}'")),
            };
            Ok(acc | lib)
        })
}

/// Parse a byte count with an optional `k`/`m` suffix.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, scale) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1024),
        Some((i, 'm' | 'M')) => (&s[..i], 1024 * 1024),
        _ => (s, 1),
    };
    let n: usize = digits
        .parse()
        .map_err(|_| format!("invalid size '{s}'"))?;
    n.checked_mul(scale)
        .ok_or_else(|| format!("size '{s}' is too large"))
}

// ── Config file ───────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Options read from an rc file.
#[derive(Debug, Default)]
pub struct Config {
    pub options: SessionOptions,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rc file text.
    ///
    /// Returns the config and a list of any errors on recognised lines;
    /// erroneous lines leave the corresponding option at its previous value.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));

            if cmd != "set" {
                continue;
            }

            let result = parse_set(args_str.trim())
                .and_then(|(name, value)| config.options.set(name, value));
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse an rc file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

/// Split `/set` arguments into name and value: `name=value` or `name value`.
fn parse_set(args: &str) -> Result<(&str, &str), String> {
    let split = args
        .split_once('=')
        .or_else(|| args.split_once(|c: char| c.is_ascii_whitespace()));
    match split {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(format!("set: expected <name>=<value>, got '{args}'")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
