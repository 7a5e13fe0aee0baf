//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The core stays free of UI frameworks
//! - All I/O on the runtime is async (no blocking HTTP, process, or sleep calls)
//! - Production code propagates errors instead of panicking
//!
//! These tests are designed to catch violations early in the development cycle.
//! The helpers below are shared by the test files in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "tui/src"];

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files under a workspace-relative directory
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// A source line outside test code, comments stripped
#[derive(Debug)]
pub struct CodeLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Code before any `//` comment
    pub code: String,
}

/// Non-test, non-comment lines of a file
///
/// Everything from the first `#[cfg(test)]` onwards is treated as test code.
pub fn production_lines(path: &Path) -> Vec<CodeLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter_map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line).trim();
            (!code.is_empty()).then(|| CodeLine {
                path: path.to_path_buf(),
                number: idx + 1,
                code: code.to_string(),
            })
        })
        .collect()
}

/// Production lines across a set of directories matching a predicate
pub fn find_violations(dirs: &[&str], is_violation: impl Fn(&str) -> bool) -> Vec<String> {
    dirs.iter()
        .flat_map(|dir| rust_sources(dir))
        .flat_map(|path| production_lines(&path))
        .filter(|line| is_violation(&line.code))
        .map(|line| format!("{}:{} - {}", line.path.display(), line.number, line.code))
        .collect()
}

/// Print violations and fail the test
pub fn report(title: &str, help: &[&str], violations: &[String]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!();
    for line in help {
        eprintln!("  {line}");
    }

    panic!("\nFound {} violation(s).\nFix these before merging!", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_members() {
        for dir in PRODUCTION_DIRS {
            assert!(workspace_root().join(dir).exists(), "missing {dir}");
        }
    }

    #[test]
    fn test_test_modules_are_skipped() {
        let dir = std::env::temp_dir().join("arch-enforcement-sample");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn a() {} // .unwrap()\nfn b() {}\n#[cfg(test)]\nmod tests { fn c() { x.unwrap(); } }\n",
        )
        .unwrap();

        let lines = production_lines(&file);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.code.contains("unwrap")));
    }
}
