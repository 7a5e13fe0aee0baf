//! Integration Test: Core/Surface Layering
//!
//! **Policy**: `stock-elf-core` is headless. It MUST NOT depend on or mention
//! terminal UI crates; everything the surface needs crosses the boundary as
//! session snapshots and `ConductorMessage`s.

use std::fs;

use architectural_enforcement::{find_violations, report, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_crates() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest");

    let violations: Vec<String> = manifest
        .lines()
        .filter(|line| UI_CRATES.iter().any(|c| line.trim_start().starts_with(c)))
        .map(|line| format!("conductor/core/Cargo.toml - {}", line.trim()))
        .collect();

    report(
        "CRITICAL: UI crates in the core manifest!",
        &["Move rendering code into tui/ and pass data through ConductorMessage."],
        &violations,
    );
}

#[test]
fn test_core_sources_have_no_ui_imports() {
    let violations = find_violations(&["conductor/core/src"], |code| {
        UI_CRATES
            .iter()
            .any(|c| code.contains(&format!("{c}::")) || code.contains(&format!("use {c}")))
    });

    report(
        "CRITICAL: UI imports in stock-elf-core!",
        &["The core must stay usable headless (tests, other surfaces)."],
        &violations,
    );
}

#[test]
fn test_surface_does_not_call_http_directly() {
    let violations = find_violations(&["tui/src"], |code| code.contains("reqwest::"));

    report(
        "CRITICAL: HTTP calls in the TUI!",
        &["Go through the AnalysisApi gateway owned by the Conductor."],
        &violations,
    );
}
