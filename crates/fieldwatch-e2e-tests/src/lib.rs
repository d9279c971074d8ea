//! End-to-end scenarios for fieldwatch.
//!
//! These tests drive full invocations:
//! - request validation through to the response envelope
//! - liveness, error aggregation and data reports over in-memory stores
//! - partial store failures and failed deliveries
//! - the CLI wiring over snapshot directories

#![cfg(test)]
