//! Test utilities for operand engine integration tests
//!
//! This module provides shared fixtures for integration tests, including:
//! - The opcode metadata document under tests/fixtures
//! - The TOML encode/decode case manifest
//! - Small helpers for building argument maps
#![allow(dead_code)]

pub mod config;

pub use config::{CaseManifest, OperandCase};

use opmeta::OpMetaTable;
use std::collections::HashMap;

pub const OPCODES_JSON: &str = include_str!("../fixtures/opcodes.json");
pub const CASES_TOML: &str = include_str!("../fixtures/cases.toml");

/// Load the fixture opcode table
pub fn table() -> OpMetaTable {
    OpMetaTable::from_json_str(OPCODES_JSON).expect("fixture metadata loads")
}

/// Argument map from `(name, value)` pairs
pub fn args(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
    pairs.iter().map(|(name, value)| (name.to_string(), *value)).collect()
}
