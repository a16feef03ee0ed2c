//! Binary-level tests: run `luahost` as a child process and check stdout,
//! stderr and the exit status.
//!
//! Every invocation passes `-f` (no rc file) and, unless the test is about
//! the environment, `-E`, so the developer's own settings cannot leak in.

use std::io::Write;
use std::process::{Command, Output, Stdio};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn luahost() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_luahost"));
    cmd.arg("-f")
        .env_remove("LUA_INIT")
        .env_remove("LUA_INIT_5_4")
        .env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    luahost()
        .arg("-E")
        .args(args)
        .output()
        .expect("failed to spawn luahost")
}

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = luahost()
        .arg("-E")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn luahost");
    child
        .stdin
        .take()
        .expect("stdin not open")
        .write_all(input.as_bytes())
        .expect("write to stdin");
    child.wait_with_output().expect("wait failed")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn script(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".lua").tempfile().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

// ── Lifecycle scenarios ───────────────────────────────────────────────────────

#[test]
fn default_greeting() {
    let out = run(&[]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "Hello, World! (from Lua)");
}

#[test]
fn hello_world_chunk() {
    let out = run(&["-e", "print('Hello, World!')"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("Hello, World!"));
    assert!(!stdout(&out).contains("from Lua"), "greeting must not run with -e");
}

#[test]
fn syntax_error_exits_non_zero() {
    let out = run(&["-e", "invalid syntax ((("]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.starts_with("luahost: "), "{err}");
    assert!(err.contains("(command line):1:"), "{err}");
}

#[test]
fn runtime_error_exits_non_zero() {
    let out = run(&["-e", "error('kaboom')"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("kaboom"));
}

#[test]
fn allocation_failure_exits_non_zero() {
    let out = run(&["-m", "1", "-e", "print('unreachable')"]);
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("cannot allocate interpreter"), "{}", stderr(&out));
}

#[test]
fn output_before_failure_is_kept() {
    let out = run(&["-e", "print('before')", "-e", "error('after')", "-e", "print('never')"]);
    assert!(!out.status.success());
    assert_eq!(stdout(&out).trim_end(), "before");
}

#[test]
fn chunks_share_one_interpreter() {
    let out = run(&["-e", "x = 20", "-e", "print(x + 22)"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "42");
}

// ── Scripts ───────────────────────────────────────────────────────────────────

#[test]
fn script_file_with_args() {
    let f = script("#!/usr/bin/env luahost\nprint(#arg, arg[1], arg[2])\n");
    let path = f.path().to_str().unwrap();
    let out = run(&[path, "alpha", "-beta"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "2\talpha\t-beta");
}

#[test]
fn script_runs_after_exec_chunks() {
    let f = script("print(greeting)\n");
    let path = f.path().to_str().unwrap();
    let out = run(&["-e", "greeting = 'hi'", path]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "hi");
}

#[test]
fn error_names_chunk_that_defined_function() {
    let f = script("f()\n");
    let path = f.path().to_str().unwrap();
    let out = run(&["-e", "function f()\n  error('deep')\nend", path]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("(command line):2: deep"), "{}", stderr(&out));
}

#[test]
fn missing_script_file() {
    let out = run(&["/nonexistent/never.lua"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("cannot read"));
}

#[test]
fn script_from_stdin() {
    let out = run_with_stdin(&["-"], "print('piped')\n");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "piped");
}

// ── Options & environment ─────────────────────────────────────────────────────

#[test]
fn restricted_libraries() {
    let out = run(&["--libs", "string", "-e", "print(os == nil, string ~= nil)"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "true\ttrue");
}

#[test]
fn capture_mode_still_reaches_stdout() {
    let out = run(&["--capture", "-e", "print('one', 2)"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "one\t2");
}

#[test]
fn capture_mode_keeps_io_write_in_chunk_order() {
    let out = run(&[
        "--capture",
        "-e",
        "io.write('a\\n') print('b')",
        "-e",
        "io.write('c\\n')",
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "a\nb\nc\n");
}

#[test]
fn lua_init_runs_first() {
    let out = luahost()
        .env("LUA_INIT", "prefix = 'init'")
        .args(["-e", "print(prefix)"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "init");
}

#[test]
fn lua_init_ignored_with_capital_e() {
    let out = luahost()
        .env("LUA_INIT", "prefix = 'init'")
        .args(["-E", "-e", "print(prefix)"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "nil");
}

#[test]
fn rc_file_sets_options() {
    let mut rc = tempfile::NamedTempFile::new().unwrap();
    writeln!(rc, ";; test rc\n/set libs=math").unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_luahost"))
        .env_remove("LUA_INIT")
        .env_remove("LUA_INIT_5_4")
        .arg(format!("--config={}", rc.path().display()))
        .args(["-E", "-e", "print(math ~= nil, string == nil)"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out).trim_end(), "true\ttrue");
}

#[test]
fn bad_rc_file_exits_non_zero() {
    let mut rc = tempfile::NamedTempFile::new().unwrap();
    writeln!(rc, "/set libs=everything").unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_luahost"))
        .arg(format!("--config={}", rc.path().display()))
        .args(["-E", "-e", "print('unreachable')"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(stderr(&out).contains("line 1"), "{}", stderr(&out));
}
