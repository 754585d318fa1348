//! Layering and source rules for the workspace.
//!
//! - `wordsort-backbone` and `wordsort-shared` are leaves: neither may depend
//!   on another workspace crate outside `[dev-dependencies]`
//! - Library sources log through `tracing`, never print
//! - The backbone never names game vocabulary from `wordsort_shared`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use regex_lite::Regex;
use serde::Deserialize;

/// Internal crates each workspace crate may depend on at runtime.
const ALLOWED_INTERNAL_DEPS: &[(&str, &[&str])] = &[
    ("wordsort-backbone", &[]),
    ("wordsort-shared", &[]),
    ("xtask", &["wordsort-backbone", "wordsort-shared"]),
];

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<Package>,
    workspace_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    manifest_path: PathBuf,
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
    /// `None` for normal dependencies, `"dev"` or `"build"` otherwise.
    kind: Option<String>,
}

struct SourceRule {
    crates: &'static [&'static str],
    pattern: &'static str,
    message: &'static str,
}

const SOURCE_RULES: &[SourceRule] = &[
    SourceRule {
        crates: &["wordsort-backbone", "wordsort-shared"],
        pattern: r"\b(println|eprintln|print|eprint|dbg)!",
        message: "library code logs through tracing",
    },
    SourceRule {
        crates: &["wordsort-backbone"],
        pattern: r"\bwordsort_shared::",
        message: "backbone src must stay independent of game vocabulary",
    },
];

pub fn run() -> anyhow::Result<()> {
    let metadata = load_metadata()?;

    let mut violations = dependency_violations(&metadata);
    violations.extend(source_violations(&metadata)?);

    if violations.is_empty() {
        println!(
            "arch-check passed ({} crates)",
            metadata.packages.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("  {violation}");
    }
    anyhow::bail!("arch-check failed with {} violation(s)", violations.len())
}

fn load_metadata() -> anyhow::Result<Metadata> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!(
            "cargo metadata failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    }

    serde_json::from_slice(&output.stdout).context("parsing cargo metadata output")
}

fn dependency_violations(metadata: &Metadata) -> Vec<String> {
    let workspace: HashSet<&str> = metadata.packages.iter().map(|p| p.name.as_str()).collect();

    let mut violations = Vec::new();
    for package in &metadata.packages {
        let allowed = ALLOWED_INTERNAL_DEPS
            .iter()
            .find(|(name, _)| *name == package.name)
            .map(|(_, allowed)| *allowed);

        let Some(allowed) = allowed else {
            violations.push(format!(
                "{}: crate has no layering entry in arch-check",
                package.name
            ));
            continue;
        };

        for dep in &package.dependencies {
            let internal = workspace.contains(dep.name.as_str());
            let runtime = dep.kind.as_deref() != Some("dev");
            if internal && runtime && !allowed.contains(&dep.name.as_str()) {
                violations.push(format!(
                    "{}: forbidden dependency on {}",
                    package.name, dep.name
                ));
            }
        }
    }
    violations
}

fn source_violations(metadata: &Metadata) -> anyhow::Result<Vec<String>> {
    let mut violations = Vec::new();

    for rule in SOURCE_RULES {
        let pattern = Regex::new(rule.pattern)
            .with_context(|| format!("compiling pattern {}", rule.pattern))?;

        for package in metadata
            .packages
            .iter()
            .filter(|p| rule.crates.contains(&p.name.as_str()))
        {
            let Some(crate_dir) = package.manifest_path.parent() else {
                continue;
            };

            for file in rust_files(&crate_dir.join("src"))? {
                let source = std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;

                for (index, line) in source.lines().enumerate() {
                    if is_comment(line) || !pattern.is_match(line) {
                        continue;
                    }
                    let shown = file.strip_prefix(&metadata.workspace_root).unwrap_or(&file);
                    violations.push(format!(
                        "{}:{}: {}",
                        shown.display(),
                        index + 1,
                        rule.message
                    ));
                }
            }
        }
    }
    Ok(violations)
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)
            .with_context(|| format!("listing {}", current.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}
