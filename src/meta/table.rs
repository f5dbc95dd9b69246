//! Read-only opcode metadata table
//!
//! Loaded once from a metadata document, then shared by reference. Lookups
//! accept the primary opcode name or any alias.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::document::OpMetaDocument;
use super::OpMeta;
use crate::error::{OperandError, OperandResult};

#[derive(Debug, Clone, Default)]
pub struct OpMetaTable {
    ops: Vec<Arc<OpMeta>>,
    /// Name or alias -> index into `ops`
    index: HashMap<String, usize>,
}

static GLOBAL: OnceLock<OpMetaTable> = OnceLock::new();

impl OpMetaTable {
    /// Build a table, rejecting names or aliases that resolve to two opcodes
    pub fn from_metas(metas: Vec<OpMeta>) -> OperandResult<Self> {
        let mut table = OpMetaTable::default();
        for meta in metas {
            let slot = table.ops.len();
            for name in meta.names() {
                if let Some(&existing) = table.index.get(name) {
                    return Err(OperandError::invalid_metadata(
                        &meta.name,
                        format!("name '{}' is already used by opcode '{}'", name, table.ops[existing].name),
                    ));
                }
                table.index.insert(name.to_string(), slot);
            }
            table.ops.push(Arc::new(meta));
        }
        debug!(target: "opmeta::meta", opcodes = table.ops.len(), names = table.index.len(), "Loaded opcode table");
        Ok(table)
    }

    /// Parse a JSON document holding one opcode object or an array of them
    pub fn from_json_str(text: &str) -> OperandResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| OperandError::invalid_metadata("<document>", e.to_string()))?;
        let docs = match value {
            serde_json::Value::Array(items) => items.into_iter().map(doc_from_value).collect::<OperandResult<Vec<_>>>()?,
            other => vec![doc_from_value(other)?],
        };
        let metas = docs
            .into_iter()
            .map(OpMeta::try_from)
            .collect::<OperandResult<Vec<_>>>()?;
        Self::from_metas(metas)
    }

    /// Look up an opcode by name or alias
    pub fn get(&self, name: &str) -> Option<&Arc<OpMeta>> {
        self.index.get(name).map(|&i| &self.ops[i])
    }

    /// Opcodes in document order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<OpMeta>> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Install the process-wide table. Returns the table back if one is already installed.
    pub fn install(self) -> Result<&'static OpMetaTable, OpMetaTable> {
        let mut pending = Some(self);
        let installed = GLOBAL.get_or_init(|| pending.take().unwrap_or_default());
        match pending {
            Some(rejected) => Err(rejected),
            None => Ok(installed),
        }
    }

    /// The process-wide table, if one was installed
    pub fn global() -> Option<&'static OpMetaTable> {
        GLOBAL.get()
    }
}

fn doc_from_value(value: serde_json::Value) -> OperandResult<OpMetaDocument> {
    let name = value
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string();
    serde_json::from_value(value).map_err(|e| OperandError::invalid_metadata(&name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DOC: &str = r#"[
        {"name": "add", "operand": 0, "inputs": {"parameters": [{"name": "values", "spread": true}]},
         "outputs": 1, "aliases": ["sum", "plus"]},
        {"name": "block-number", "operand": 0, "inputs": 0, "outputs": 1}
    ]"#;

    #[test]
    fn test_lookup_by_name_and_alias() {
        let table = OpMetaTable::from_json_str(DOC).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("add").unwrap().name, "add");
        assert_eq!(table.get("sum").unwrap().name, "add");
        assert!(Arc::ptr_eq(table.get("plus").unwrap(), table.get("add").unwrap()));
        assert!(table.get("missing").is_none());
        let names: Vec<_> = table.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["add", "block-number"]);
    }

    #[test]
    fn test_single_object_document() {
        let table = OpMetaTable::from_json_str(
            r#"{"name": "block-number", "operand": 0, "inputs": 0, "outputs": 1}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let err = OpMetaTable::from_json_str(
            r#"[
            {"name": "add", "operand": 0, "inputs": 0, "outputs": 1},
            {"name": "plus", "operand": 0, "inputs": 0, "outputs": 1, "aliases": ["add"]}
        ]"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
        assert!(err.to_string().contains("'add'"));
    }

    #[test]
    fn test_bad_entry_names_its_opcode() {
        let err = OpMetaTable::from_json_str(r#"[{"name": "broken", "operand": 0, "inputs": 0}]"#).unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("outputs"));
    }

    #[test]
    fn test_global_install_once() {
        let table = OpMetaTable::from_json_str(DOC).unwrap();
        let installed = table.install().unwrap();
        assert!(installed.get("sum").is_some());
        assert!(OpMetaTable::global().is_some());
        assert!(OpMetaTable::default().install().is_err());
    }
}
