//! Integration tests for `src/providers/`.

#[path = "providers/http_retry_test.rs"]
mod http_retry_test;
