//! Shared test utilities and fixtures
//!
//! Projects on disk plus a sandboxed `natty` invocation.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Makefile whose `all` rule fails with one error and one warning.
pub const FAILING_MAKEFILE: &str = "\
all:
\t@echo compiling
\t@echo 'src/parser.c:42: error: expected expression' >&2
\t@echo 'src/lexer.c(7): warning: unused variable' >&2
\t@exit 2
clean:
\t@echo cleaned
install:
\t@echo installed
";

/// A project with sources under `src/` and the given Makefile and `natty.toml`.
pub fn project(makefile: &str, natty_toml: Option<&str>) -> TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("src")).expect("src dir");
    fs::write(tmp.path().join("src/parser.c"), "int parse(void);\n").expect("parser.c");
    fs::write(tmp.path().join("src/lexer.c"), "int lex(void);\n").expect("lexer.c");
    fs::write(tmp.path().join("Makefile"), makefile).expect("Makefile");
    if let Some(toml) = natty_toml {
        fs::write(tmp.path().join("natty.toml"), toml).expect("natty.toml");
    }
    tmp
}

/// Run the `natty` binary against `project` with an isolated home directory.
pub fn natty(project: &Path, home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_natty"))
        .arg("--doc")
        .arg(project)
        .args(args)
        .env("HOME", home)
        .env_remove("VISUAL")
        .env_remove("EDITOR")
        .current_dir(home)
        .output()
        .expect("run natty")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
