// Case manifest parser for TOML-based operand encode/decode cases

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One encode/decode expectation against the opcode fixtures
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperandCase {
    /// Opcode name or alias
    pub opcode: String,
    /// Logical argument values passed to `build`
    #[serde(default)]
    pub args: HashMap<String, i64>,
    /// Call-site input count
    #[serde(default)]
    pub inputs: usize,
    /// Expected operand word
    pub word: u16,
    /// Expected `render` output
    pub render: String,
    /// Expected output count, when it depends on the word
    #[serde(default)]
    pub outputs: Option<usize>,
}

/// Complete case manifest
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseManifest {
    #[serde(rename = "case")]
    pub cases: Vec<OperandCase>,
}

impl CaseManifest {
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Load the manifest bundled under tests/fixtures
    pub fn load_default() -> Result<Self, String> {
        Self::parse(super::CASES_TOML)
    }
}
