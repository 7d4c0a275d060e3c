//! Integration tests for the `solve` command.
use facilp::cli::{SolveOpts, handle_solve_command};
use facilp::settings::Settings;
use std::path::PathBuf;

/// Get the path to a bundled instance file.
fn get_instance_path(name: &str) -> PathBuf {
    PathBuf::from("data").join(name)
}

/// An integration test for the `solve` command.
#[test]
fn test_handle_solve_command() {
    unsafe { std::env::set_var("FACILP_LOG_LEVEL", "off") };

    let found = handle_solve_command(
        &get_instance_path("small.txt"),
        &SolveOpts::default(),
        Some(Settings::default()),
    )
    .unwrap();
    assert!(found);

    // Second time will fail because the logging is already initialised
    assert_eq!(
        handle_solve_command(
            &get_instance_path("small.txt"),
            &SolveOpts::default(),
            Some(Settings::default())
        )
        .unwrap_err()
        .chain()
        .next()
        .unwrap()
        .to_string(),
        "Failed to initialise logging."
    );
}
