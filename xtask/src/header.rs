// Licensed under the Apache-2.0 license

use crate::PROJECT_ROOT;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const LICENSE_TEXT: &str = "Licensed under the Apache-2.0 license";

/// The license has to appear within this many leading lines.
const HEADER_LINES: usize = 3;

/// Build output and VCS state; nothing in them is authored here.
const IGNORED_DIRS: &[&str] = &[".git", "out", "target"];

/// Comment syntax used to add a header, per extension. Payload images, TOML fixtures
/// and docs outside of this list are not checked.
fn comment_style(path: &Path) -> Option<(&'static str, &'static str)> {
    match path.extension()?.to_str()? {
        "rs" => Some(("// ", "")),
        "toml" | "sh" | "yml" | "yaml" => Some(("# ", "")),
        "ld" => Some(("/* ", " */")),
        _ => None,
    }
}

fn has_license(contents: &str) -> bool {
    contents
        .lines()
        .take(HEADER_LINES)
        .any(|line| line.contains(LICENSE_TEXT))
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

/// Files under `root` that should carry a license header but do not.
fn files_missing_license(root: &Path) -> Result<Vec<PathBuf>> {
    let mut missing = vec![];
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_ignored(e)) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || comment_style(path).is_none() {
            continue;
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        if !has_license(&contents) {
            missing.push(path.to_path_buf());
        }
    }
    missing.sort();
    Ok(missing)
}

fn add_license(path: &Path) -> Result<()> {
    let Some((open, close)) = comment_style(path) else {
        bail!("{}: no comment style for this file type", path.display());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let separator = if contents.starts_with('\n') { "" } else { "\n" };
    fs::write(path, format!("{open}{LICENSE_TEXT}{close}\n{separator}{contents}"))
        .with_context(|| format!("writing {}", path.display()))
}

fn relative(path: &Path) -> String {
    path.strip_prefix(&*PROJECT_ROOT)
        .unwrap_or(path)
        .display()
        .to_string()
}

pub(crate) fn check() -> Result<()> {
    println!("Running: license header check");
    let missing = files_missing_license(&PROJECT_ROOT)?;
    for path in missing.iter() {
        println!(
            "File {:?} doesn't contain {LICENSE_TEXT:?} in the first {HEADER_LINES} lines",
            relative(path)
        );
    }
    if !missing.is_empty() {
        bail!("Some files failed to have the correct license header; to fix, run \"cargo xtask header-fix\" from the repo root");
    }
    Ok(())
}

pub(crate) fn fix() -> Result<()> {
    println!("Running: license header fix");
    for path in files_missing_license(&PROJECT_ROOT)? {
        println!("Fixing header in {}", relative(&path));
        add_license(&path)?;
    }
    Ok(())
}
