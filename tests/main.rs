//! Integration tests for the `stratus` binary.

#[path = "main/cli_test.rs"]
mod cli_test;
