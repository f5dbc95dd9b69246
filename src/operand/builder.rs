//! Operand encoding
//!
//! Turns named logical argument values into a packed operand word. Each
//! argument goes through: logical value -> (inverse computation) -> raw
//! value -> validRange check -> pack. Nothing is written to the result
//! until every argument has succeeded.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::bits::pack;
use super::range::validate;
use crate::error::{OperandError, OperandResult};
use crate::meta::{OpMeta, OperandArgSpec, OperandSpec, INPUTS_ARGUMENT};

/// Encode `args` (logical values by argument name) into an operand word.
///
/// The reserved `inputs` argument takes `input_count`; an `inputs` entry in
/// `args` is ignored.
pub fn build(meta: &OpMeta, args: &HashMap<String, i64>, input_count: usize) -> OperandResult<u16> {
    let specs = match &meta.operand {
        OperandSpec::Zero => return Ok(0),
        OperandSpec::Args(specs) => specs,
    };

    for name in args.keys() {
        if meta.argument(name).is_none() || name == INPUTS_ARGUMENT {
            debug!(target: "opmeta::build", opcode = %meta.name, argument = %name, "Ignoring argument");
        }
    }

    let mut word = 0u16;
    for spec in specs {
        let packed = encode_argument(meta, spec, args, input_count)
            .and_then(|raw| Ok((raw, pack(word, spec.bits, raw)?)))
            .map_err(|err| err.in_context(&meta.name, &format!("argument '{}'", spec.name)));
        let raw = match packed {
            Ok((raw, packed)) => {
                word = packed;
                raw
            }
            Err(err) => {
                debug!(target: "opmeta::build", opcode = %meta.name, argument = %spec.name, error = %err, "Build rejected");
                return Err(err);
            }
        };
        trace!(target: "opmeta::build", opcode = %meta.name, argument = %spec.name, raw, bits = %spec.bits, "Packed argument");
    }

    trace!(target: "opmeta::build", opcode = %meta.name, word, "Built operand");
    Ok(word)
}

/// Raw bit value for one argument, validated against its validRange
fn encode_argument(
    meta: &OpMeta,
    spec: &OperandArgSpec,
    args: &HashMap<String, i64>,
    input_count: usize,
) -> OperandResult<i64> {
    let logical = if spec.is_inputs() {
        i64::try_from(input_count)
            .map_err(|_| OperandError::Range(format!("input count {} does not fit an i64", input_count)))?
    } else {
        *args.get(&spec.name).ok_or_else(|| OperandError::MissingArgument {
            opcode: meta.name.clone(),
            argument: spec.name.clone(),
        })?
    };

    let raw = match &spec.computation {
        None => logical,
        Some(computation) => {
            let matches = computation.invert(logical, spec.bits.width())?;
            // Several raw values may map to the target; only those inside
            // validRange are eligible. Exactly one must remain.
            let eligible: SmallVec<[u16; 4]> = matches
                .iter()
                .copied()
                .filter(|raw| validate(*raw as i64, spec.valid_range.as_ref()))
                .collect();
            match (matches.len(), eligible.as_slice()) {
                (_, [raw]) => *raw as i64,
                // Nothing eligible but a single preimage: let validation name the value
                (1, []) => matches[0] as i64,
                (_, eligible) => {
                    return Err(OperandError::NonInvertibleComputation {
                        opcode: meta.name.clone(),
                        argument: spec.name.clone(),
                        expression: computation.source().to_string(),
                        target: logical,
                        matches: if eligible.is_empty() { matches.len() } else { eligible.len() },
                    })
                }
            }
        }
    };

    match &spec.valid_range {
        Some(permitted) if !validate(raw, Some(permitted)) => Err(OperandError::Validation {
            opcode: meta.name.clone(),
            argument: spec.name.clone(),
            value: raw,
            permitted: permitted.clone(),
        }),
        _ => Ok(raw),
    }
}
