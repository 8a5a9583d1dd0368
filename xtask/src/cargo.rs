// Licensed under the Apache-2.0 license

use crate::PROJECT_ROOT;
use anyhow::{bail, Result};
use std::process::{Command, Stdio};

/// Runs `cargo` at the workspace root and fails with `hint` when it exits unsuccessfully.
fn run_cargo(args: &[&str], quiet: bool, hint: &str) -> Result<()> {
    println!("Running: cargo {}", args.join(" "));
    let mut command = Command::new("cargo");
    command.current_dir(&*PROJECT_ROOT).args(args);
    if quiet {
        command.stdout(Stdio::null());
    }
    if !command.status()?.success() {
        bail!("cargo {} failed; {}", args[0], hint);
    }
    Ok(())
}

pub(crate) fn clippy() -> Result<()> {
    run_cargo(
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
            "--no-deps",
        ],
        false,
        "fix the lints reported above",
    )
}

pub(crate) fn format() -> Result<()> {
    run_cargo(&["fmt", "--check", "--all"], false, "run \"cargo fmt --all\" to fix")
}

pub(crate) fn cargo_lock() -> Result<()> {
    run_cargo(
        &["tree", "--locked", "--workspace"],
        true,
        "please include required changes to Cargo.lock in your pull request",
    )
}

/// Unit tests of the header library and the payload tool, including its fixture tests.
pub(crate) fn test() -> Result<()> {
    run_cargo(&["test", "--workspace"], false, "see the failing tests above")
}

pub(crate) fn precheckin() -> Result<()> {
    cargo_lock()?;
    format()?;
    clippy()?;
    crate::header::check()?;
    test()
}
