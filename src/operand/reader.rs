//! Operand decoding

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use tracing::trace;

use super::arity::{resolve_inputs, resolve_outputs, InputArity};
use super::bits::unpack;
use crate::computation::apply_optional;
use crate::error::OperandResult;
use crate::meta::OpMeta;

/// Logical view of one operand word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOperand {
    /// Logical argument values, including `inputs` when declared
    pub arguments: BTreeMap<String, i64>,
    pub inputs: InputArity,
    pub outputs: usize,
}

impl fmt::Display for DecodedOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = self
            .arguments
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .join(" ");
        write!(f, "{{{}}} inputs: {} outputs: {}", arguments, self.inputs, self.outputs)
    }
}

/// Decode `word` into logical argument values and resolved arities
pub fn read(meta: &OpMeta, word: u16) -> OperandResult<DecodedOperand> {
    let mut arguments = BTreeMap::new();
    for spec in meta.operand_args() {
        let raw = unpack(word, spec.bits);
        let value = apply_optional(spec.computation.as_ref(), raw as i64)
            .map_err(|err| err.in_context(&meta.name, &format!("argument '{}'", spec.name)))?;
        trace!(target: "opmeta::read", opcode = %meta.name, argument = %spec.name, raw, value, "Decoded argument");
        arguments.insert(spec.name.clone(), value);
    }

    let inputs =
        resolve_inputs(&meta.inputs, Some(word)).map_err(|err| err.in_context(&meta.name, "computed inputs"))?;
    let outputs =
        resolve_outputs(&meta.outputs, Some(word)).map_err(|err| err.in_context(&meta.name, "computed outputs"))?;
    trace!(target: "opmeta::read", opcode = %meta.name, word, inputs = inputs.count, outputs, "Decoded operand");

    Ok(DecodedOperand {
        arguments,
        inputs,
        outputs,
    })
}

/// Human-readable form `name<v1 v2 ...>`, arguments in declaration order.
///
/// The `inputs` argument is implied by the call site and left out.
pub fn render(meta: &OpMeta, word: u16) -> OperandResult<String> {
    let decoded = read(meta, word)?;
    let values: Vec<i64> = meta
        .operand_args()
        .iter()
        .filter(|spec| !spec.is_inputs())
        .filter_map(|spec| decoded.arguments.get(&spec.name).copied())
        .collect();
    if values.is_empty() {
        Ok(meta.name.clone())
    } else {
        Ok(format!("{}<{}>", meta.name, values.iter().join(" ")))
    }
}
