//! Integration tests for directory merkle trees

mod cli_commands;
mod config_integration;
mod error_policy;
mod hasher_verification;
mod store_integration;

pub use test_utils::*;
