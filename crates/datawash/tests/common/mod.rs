//! Shared test utilities for datawash integration tests.
//!
//! This module provides:
//! - `MockService`, an in-process HTTP + WebSocket stand-in for the
//!   cleaning service, driven by a per-test `ServiceScript`
//! - helpers for writing upload fixtures

pub mod harness;

pub use harness::{write_csv_fixture, MockService, ServiceScript, StatusReply};
