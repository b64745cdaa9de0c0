//! The `natty` binary's headless subcommands.

use crate::common::{FAILING_MAKEFILE, natty, project, stderr_of, stdout_of};

const FAILING_BUILD: &str = r#"
[build]
command = "echo compiling {target}; echo 'src/parser.c:42: error: expected expression' >&2; echo 'src/lexer.c(7): warning: unused variable' >&2; exit 2"
ignored_targets = "install"

[editor]
command = "true {0} {1}"
"#;

#[test]
fn targets_lists_makefile_rules_minus_ignored() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(FAILING_MAKEFILE, Some("[build]\nignored_targets = \"install\"\n"));

    let output = natty(proj.path(), home.path(), &["targets"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "* all\n  clean\n");
}

#[test]
fn failing_build_reports_diagnostics_and_exit_code() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(FAILING_MAKEFILE, Some(FAILING_BUILD));

    let output = natty(proj.path(), home.path(), &["build"]);
    assert_eq!(output.status.code(), Some(2));

    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("$ echo compiling all;"), "{stdout}");
    assert!(stdout.contains("compiling all\n"));

    let stderr = stderr_of(&output);
    assert!(stderr.contains("src/parser.c:42: error: expected expression\n"));
    assert!(stderr.contains("src/lexer.c:7: warning: unused variable\n"));
    assert!(stderr.ends_with("natty: 1 errors, 1 warnings\n"), "{stderr}");
}

#[test]
fn build_named_target() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(FAILING_MAKEFILE, Some(FAILING_BUILD));

    let output = natty(proj.path(), home.path(), &["build", "clean"]);
    assert!(stdout_of(&output).contains("compiling clean\n"));

    let output = natty(proj.path(), home.path(), &["build", "install"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("unknown target: install"));
}

#[test]
fn clean_build_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(FAILING_MAKEFILE, Some("[build]\ncommand = \"echo fine\"\n"));

    let output = natty(proj.path(), home.path(), &["build"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stderr_of(&output).contains("natty: built in "));
}

#[test]
fn missing_command_exits_127() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(
        FAILING_MAKEFILE,
        Some("[build]\ncommand = \"natty-no-such-tool-xyz\"\n"),
    );

    let output = natty(proj.path(), home.path(), &["build"]);
    assert_eq!(output.status.code(), Some(127));
    assert!(stderr_of(&output).contains("natty: failed with exit code 127"));
}

#[test]
fn open_resolves_under_the_project() {
    let home = tempfile::tempdir().unwrap();
    let proj = project(FAILING_MAKEFILE, Some(FAILING_BUILD));

    let output = natty(
        proj.path(),
        home.path(),
        &["open", "In file included from parser.c:42: oops"],
    );
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stdout_of(&output).trim_end().ends_with("src/parser.c"));

    let output = natty(proj.path(), home.path(), &["open", "nothing.c:1: here"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("no file named"));
}

#[test]
fn global_preferences_come_from_home() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join(".natty")).unwrap();
    std::fs::write(
        home.path().join(".natty/config.toml"),
        "[build]\nignored_targets = \"clean\"\n",
    )
    .unwrap();
    let proj = project(FAILING_MAKEFILE, None);

    let output = natty(proj.path(), home.path(), &["targets"]);
    assert_eq!(stdout_of(&output), "* all\n  install\n");
    assert!(home.path().join(".natty/logs/natty.log").exists());
}
