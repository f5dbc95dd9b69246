//! Input/output arity resolution
//!
//! Fixed arities come straight from metadata. Computed arities are read from
//! operand bits and transformed by the `bits` computation, so they need the
//! concrete operand word.

use std::fmt;

use itertools::Itertools;

use super::bits::{unpack, BitRange};
use crate::computation::{apply_optional, Computation};
use crate::error::{OperandError, OperandResult};
use crate::meta::{InputParameter, InputSpec, OutputSpec};

/// Resolved input arity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputArity {
    pub count: usize,
    /// Declared parameters; empty for computed or absent inputs
    pub parameters: Vec<InputParameter>,
}

impl InputArity {
    /// A trailing spread parameter accepts any number of extra inputs
    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.spread)
    }
}

impl fmt::Display for InputArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameters.is_empty() {
            return write!(f, "{}", self.count);
        }
        let names = self
            .parameters
            .iter()
            .map(|p| if p.spread { format!("...{}", p.name) } else { p.name.clone() })
            .join(", ");
        write!(f, "{} ({})", self.count, names)
    }
}

pub fn resolve_inputs(spec: &InputSpec, word: Option<u16>) -> OperandResult<InputArity> {
    match spec {
        InputSpec::None => Ok(InputArity::default()),
        InputSpec::Fixed(parameters) => Ok(InputArity {
            count: parameters.len(),
            parameters: parameters.clone(),
        }),
        InputSpec::Computed { bits, computation } => Ok(InputArity {
            count: computed_count(*bits, computation.as_ref(), word, "inputs")?,
            parameters: Vec::new(),
        }),
    }
}

pub fn resolve_outputs(spec: &OutputSpec, word: Option<u16>) -> OperandResult<usize> {
    match spec {
        OutputSpec::Fixed(count) => Ok(*count),
        OutputSpec::Computed { bits, computation } => {
            computed_count(*bits, computation.as_ref(), word, "outputs")
        }
    }
}

fn computed_count(
    bits: BitRange,
    computation: Option<&Computation>,
    word: Option<u16>,
    what: &'static str,
) -> OperandResult<usize> {
    let word = word.ok_or(OperandError::MissingOperand { what })?;
    let raw = unpack(word, bits);
    let count = apply_optional(computation, raw as i64)?;
    usize::try_from(count).map_err(|_| {
        OperandError::Range(format!(
            "computed {} count {} from raw value {} is negative",
            what, count, raw
        ))
    })
}
