//! Command-line front end.
//!
//! Usage:
//!   luahost [-e <chunk>]... [-E] [-d] [--libs <list>] [-m <bytes>]
//!           [-f[=<file>]] [<script> [<args>...]]
//!
//! Order of work, as in the standalone Lua interpreter: the `arg` table is
//! built, `LUA_INIT` runs, then each `-e` chunk, then the script.  With no
//! `-e` and no script the built-in greeting runs instead.

use std::path::{Path, PathBuf};

use clap::Parser;
use directories::ProjectDirs;
use mlua::StdLib;
use tracing::{debug, warn};

use crate::chunk::{Chunk, GREETING};
use crate::config::{parse_libs, parse_size, Config, SessionOptions};
use crate::error::{Error, Result};
use crate::output::OutputMode;
use crate::session::Session;

/// Environment variable naming an rc file.
pub const CONFIG_ENV: &str = "LUAHOST_CONFIG";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "luahost", version, about = "Run Lua 5.4 chunks in an embedded interpreter")]
pub struct CliArgs {
    /// Execute CHUNK before the script (repeatable).
    #[arg(short = 'e', value_name = "CHUNK")]
    pub exec: Vec<String>,

    /// Ignore environment variables (LUA_INIT, LUAHOST_CONFIG).
    #[arg(short = 'E')]
    pub ignore_env: bool,

    /// Debug logging on stderr.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Libraries to open: `all`, `none`, or a comma list of coroutine,
    /// table, io, os, string, utf8, math, package (`debug` is not available).
    #[arg(long, value_name = "LIST", value_parser = parse_libs)]
    pub libs: Option<StdLib>,

    /// Interpreter memory cap in bytes (`k`/`m` suffixes, 0 = unlimited).
    #[arg(short = 'm', long, value_name = "BYTES", value_parser = parse_size)]
    pub memory_limit: Option<usize>,

    /// Collect `print` output and write it after each chunk.  `io.write`
    /// is not captured; a chunk's `io.write` output comes before its
    /// captured lines.
    #[arg(long)]
    pub capture: bool,

    /// `-f` alone skips the rc file; `-f=<file>` loads that file.
    #[arg(short = 'f', long = "config", value_name = "FILE", num_args = 0..=1, require_equals = true)]
    pub config: Option<Option<PathBuf>>,

    /// Script to run (`-` for stdin) followed by its arguments.
    #[arg(value_name = "SCRIPT", trailing_var_arg = true, allow_hyphen_values = true)]
    pub script: Vec<String>,
}

/// How to choose the rc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    Search,
    /// `-f` with no file argument: no rc file.
    Skip,
    /// `-f=<file>`: load this specific file.
    Explicit(PathBuf),
}

impl CliArgs {
    pub fn config_file(&self) -> ConfigFile {
        match &self.config {
            None => ConfigFile::Search,
            Some(None) => ConfigFile::Skip,
            Some(Some(path)) => ConfigFile::Explicit(path.clone()),
        }
    }

    /// Script path and its arguments, if a script was given.
    pub fn script(&self) -> Option<(&str, &[String])> {
        self.script
            .split_first()
            .map(|(script, args)| (script.as_str(), args))
    }

    /// Layer command-line overrides on top of `base`.
    pub fn apply(&self, mut base: SessionOptions) -> SessionOptions {
        if let Some(libs) = self.libs {
            base.libs = libs;
        }
        if let Some(limit) = self.memory_limit {
            base.memory_limit = (limit != 0).then_some(limit);
        }
        if self.capture {
            base.output = OutputMode::Capture;
        }
        base
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the rc file in the standard locations.
///
/// Order: `$LUAHOST_CONFIG` (unless `ignore_env`), the per-user config
/// directory, then `./.luahostrc`.  Returns the first path that exists.
pub fn find_user_config(ignore_env: bool) -> Option<PathBuf> {
    let from_env = (!ignore_env)
        .then(|| std::env::var_os(CONFIG_ENV))
        .flatten()
        .map(PathBuf::from);
    let user = ProjectDirs::from("", "", "luahost").map(|d| d.config_dir().join("luahostrc"));

    from_env
        .into_iter()
        .chain(user)
        .chain(std::iter::once(PathBuf::from("./.luahostrc")))
        .find(|p| p.exists())
}

/// Resolve session options from the rc file and the command line.
///
/// An explicitly named rc file must exist.  Any error in the rc file is
/// fatal; the first one is returned and the rest are logged.
pub fn resolve_options(args: &CliArgs) -> Result<SessionOptions> {
    let path = match args.config_file() {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(p) => Some(p),
        ConfigFile::Search => find_user_config(args.ignore_env),
    };

    let base = match path {
        None => SessionOptions::default(),
        Some(path) => {
            debug!(path = %path.display(), "loading rc file");
            let (config, errors) = Config::load_file(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let mut errors = errors.into_iter();
            if let Some(first) = errors.next() {
                for e in errors {
                    warn!(path = %path.display(), "{e}");
                }
                return Err(Error::Config { path, source: first });
            }
            config.options
        }
    };

    Ok(args.apply(base))
}

/// `LUA_INIT_5_4`, else `LUA_INIT`: `@file` runs a file, anything else is
/// run as source.
pub fn init_chunk() -> Result<Option<Chunk>> {
    let Some(value) = ["LUA_INIT_5_4", "LUA_INIT"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
    else {
        return Ok(None);
    };
    match value.strip_prefix('@') {
        Some(path) => Chunk::from_file(Path::new(path)).map(Some),
        None => Ok(Some(Chunk::inline("LUA_INIT", value))),
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Run everything the command line asks for in one session.
pub fn run(args: &CliArgs) -> Result<()> {
    let options = resolve_options(args)?;

    let mut session = Session::create(options)?;
    session.register_standard_library()?;

    if let Some((script, script_args)) = args.script() {
        session.set_script_args(env!("CARGO_PKG_NAME"), script, script_args)?;
    }

    if !args.ignore_env {
        if let Some(chunk) = init_chunk()? {
            run_chunk(&mut session, &chunk)?;
        }
    }

    for source in &args.exec {
        run_chunk(&mut session, &Chunk::inline("(command line)", source.as_str()))?;
    }

    match args.script() {
        Some(("-", _)) => run_chunk(&mut session, &Chunk::from_stdin()?)?,
        Some((path, _)) => run_chunk(&mut session, &Chunk::from_file(Path::new(path))?)?,
        None if args.exec.is_empty() => {
            run_chunk(&mut session, &Chunk::inline("greeting", GREETING))?
        }
        None => {}
    }

    session.close();
    Ok(())
}

/// Execute one chunk, then write anything it printed in capture mode.
///
/// `io.write` goes through C stdio, which is flushed first so its output
/// is not overtaken by the captured lines.
fn run_chunk(session: &mut Session, chunk: &Chunk) -> Result<()> {
    let result = session.execute(chunk);
    let flushed = session.flush_stdio();
    for line in session.output().drain() {
        println!("{line}");
    }
    result.and(flushed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
