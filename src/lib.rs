//! Attack-fuzzing engine for JSON Web Tokens found in captured HTTP traffic.
//!
//! A [`fuzzers::context::ServerSideAttack`] describes one parameter carrying a
//! JWT. The strategies from [`fuzzers::default_fuzzers`] forge tokens from it,
//! submit them through a [`fuzzers::context::ScanHost`] and report what the
//! target accepted.

pub mod config;
pub mod constants;
pub mod error;
pub mod fuzzers;
pub mod helpers;
pub mod host;
pub mod jwt_core;
pub mod types;
