//! Integration Test: Async I/O and Error Propagation
//!
//! **Policy**: Production code on the runtime MUST NOT block it.
//! **Required**: `reqwest` async client, `tokio::process`, `tokio::time`.
//!
//! Config loading and log-file setup run before the UI loop and may use
//! `std::fs`; they are not checked here.

use architectural_enforcement::{find_violations, report, PRODUCTION_DIRS};

#[test]
fn test_no_blocking_http_client() {
    let violations = find_violations(PRODUCTION_DIRS, |code| code.contains("reqwest::blocking"));

    report(
        "CRITICAL: Blocking HTTP client in production code!",
        &["✅ REQUIRED: reqwest::Client with .await"],
        &violations,
    );
}

#[test]
fn test_no_blocking_process_spawn() {
    let violations =
        find_violations(PRODUCTION_DIRS, |code| code.contains("std::process::Command"));

    report(
        "CRITICAL: Blocking process I/O in production code!",
        &["✅ REQUIRED: tokio::process::Command with .await"],
        &violations,
    );
}

#[test]
fn test_no_thread_sleep() {
    let violations = find_violations(PRODUCTION_DIRS, |code| code.contains("thread::sleep"));

    report(
        "CRITICAL: Sleep calls found in production code!",
        &[
            "✅ ACCEPTABLE: tokio::time::sleep for TUI frame limiting",
            "❌ FORBIDDEN: std::thread::sleep on the runtime",
        ],
        &violations,
    );
}

#[test]
fn test_core_has_no_sleep() {
    let violations = find_violations(&["conductor/core/src"], |code| code.contains("sleep("));

    report(
        "CRITICAL: Sleep calls found in stock-elf-core!",
        &["Wait on channels or I/O instead of sleeping."],
        &violations,
    );
}

#[test]
fn test_no_panicking_unwraps() {
    let violations = find_violations(PRODUCTION_DIRS, |code| {
        code.contains(".unwrap()") || code.contains(".expect(")
    });

    report(
        "CRITICAL: unwrap()/expect() in production code!",
        &["Propagate errors with ? (thiserror in the core, anyhow in the binary)."],
        &violations,
    );
}
