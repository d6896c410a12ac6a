//! Scan hosts that replay fuzzed tokens against a live target.

pub mod http;

pub use http::{Baseline, HttpScanHost, HttpTarget, TokenPlacement};
