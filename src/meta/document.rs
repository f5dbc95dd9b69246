//! Serde mirrors of the JSON opcode metadata schema.
//!
//! The schema uses untagged unions (`operand: 0 | [...]`,
//! `inputs: 0 | {...}`, `outputs: number | {...}`). These types accept
//! exactly that shape; [`TryFrom<OpMetaDocument>`] then turns a document
//! into a validated [`OpMeta`], compiling every computation once.
//!
//! ```json
//! {
//!   "name": "call",
//!   "desc": "Call a source",
//!   "operand": [
//!     { "name": "inputs", "bits": [0, 3] },
//!     { "name": "outputs", "bits": [4, 7], "computation": "arg + 1" },
//!     { "name": "source-index", "bits": [8, 15], "validRange": [[0, 31]] }
//!   ],
//!   "inputs": { "parameters": [], "bits": [0, 3] },
//!   "outputs": { "bits": [4, 7], "computation": "bits + 1" },
//!   "aliases": ["call-source"]
//! }
//! ```

use serde::{Deserialize, Deserializer};

use super::{
    BitRange, InputParameter, InputSpec, OpMeta, OperandArgSpec, OperandSpec, OutputSpec, RangeEntry,
    ValidRange,
};
use crate::computation::{Computation, Variable};
use crate::error::{OperandError, OperandResult};

/// The literal `0` used by the schema as a "nothing here" sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroSentinel;

impl<'de> Deserialize<'de> for ZeroSentinel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        if value == 0 {
            Ok(ZeroSentinel)
        } else {
            Err(serde::de::Error::custom(format!("expected the sentinel 0, found {}", value)))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpMetaDocument {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub operand: OperandDocument,
    pub inputs: InputDocument,
    pub outputs: OutputDocument,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OperandDocument {
    Zero(ZeroSentinel),
    Args(Vec<OperandArgDocument>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperandArgDocument {
    pub bits: [u8; 2],
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub computation: Option<String>,
    #[serde(default, rename = "validRange")]
    pub valid_range: Option<Vec<Vec<u64>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputDocument {
    None(ZeroSentinel),
    Object(InputObjectDocument),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputObjectDocument {
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    #[serde(default)]
    pub bits: Option<[u8; 2]>,
    #[serde(default)]
    pub computation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterDocument {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub spread: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputDocument {
    Count(u64),
    Object(OutputObjectDocument),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputObjectDocument {
    #[serde(default)]
    pub bits: Option<[u8; 2]>,
    #[serde(default)]
    pub computation: Option<String>,
}

impl OpMetaDocument {
    pub fn from_json_str(text: &str) -> OperandResult<Self> {
        serde_json::from_str(text).map_err(|e| OperandError::invalid_metadata("<document>", e.to_string()))
    }
}

impl TryFrom<OpMetaDocument> for OpMeta {
    type Error = OperandError;

    fn try_from(doc: OpMetaDocument) -> OperandResult<Self> {
        let opcode = doc.name.as_str();

        let operand = match doc.operand {
            OperandDocument::Zero(_) => OperandSpec::Zero,
            OperandDocument::Args(args) => OperandSpec::Args(
                args.into_iter()
                    .map(|arg| convert_arg(opcode, arg))
                    .collect::<OperandResult<_>>()?,
            ),
        };

        let inputs = match doc.inputs {
            InputDocument::None(_) => InputSpec::None,
            InputDocument::Object(InputObjectDocument {
                bits: Some(bits),
                computation,
                ..
            }) => InputSpec::Computed {
                bits: convert_bits(opcode, "inputs", bits)?,
                computation: compile_optional(opcode, "computed inputs", computation, Variable::Bits)?,
            },
            InputDocument::Object(InputObjectDocument {
                computation: Some(computation),
                ..
            }) if !computation.trim().is_empty() => {
                return Err(OperandError::invalid_metadata(
                    opcode,
                    format!("inputs computation '{}' requires a bits range", computation),
                ));
            }
            InputDocument::Object(InputObjectDocument { parameters, .. }) => InputSpec::Fixed(
                parameters
                    .into_iter()
                    .map(|p| InputParameter {
                        name: p.name,
                        desc: p.desc,
                        spread: p.spread,
                    })
                    .collect(),
            ),
        };

        let outputs = match doc.outputs {
            OutputDocument::Count(n) => OutputSpec::Fixed(usize::try_from(n).map_err(|_| {
                OperandError::invalid_metadata(opcode, format!("output count {} is too large", n))
            })?),
            OutputDocument::Object(OutputObjectDocument {
                bits: Some(bits),
                computation,
            }) => OutputSpec::Computed {
                bits: convert_bits(opcode, "outputs", bits)?,
                computation: compile_optional(opcode, "computed outputs", computation, Variable::Bits)?,
            },
            OutputDocument::Object(OutputObjectDocument { bits: None, .. }) => {
                return Err(OperandError::invalid_metadata(
                    opcode,
                    "computed outputs require a bits range",
                ))
            }
        };

        OpMeta::from_parts(doc.name.clone(), doc.desc, operand, inputs, outputs, doc.aliases)
    }
}

fn convert_arg(opcode: &str, arg: OperandArgDocument) -> OperandResult<OperandArgSpec> {
    let bits = convert_bits(opcode, &arg.name, arg.bits)?;
    let valid_range = arg
        .valid_range
        .map(|entries| convert_valid_range(opcode, &arg.name, entries))
        .transpose()?;
    Ok(OperandArgSpec {
        computation: compile_optional(
            opcode,
            &format!("argument '{}'", arg.name),
            arg.computation,
            Variable::Arg,
        )?,
        name: arg.name,
        desc: arg.desc,
        bits,
        valid_range,
    })
}

fn convert_bits(opcode: &str, owner: &str, [start, end]: [u8; 2]) -> OperandResult<BitRange> {
    BitRange::new(start, end).map_err(|e| match e {
        OperandError::Range(reason) => {
            OperandError::invalid_metadata(opcode, format!("'{}': {}", owner, reason))
        }
        other => other,
    })
}

fn convert_valid_range(opcode: &str, argument: &str, entries: Vec<Vec<u64>>) -> OperandResult<ValidRange> {
    let bound = |v: u64| {
        u16::try_from(v).map_err(|_| {
            OperandError::invalid_metadata(
                opcode,
                format!("operand argument '{}' validRange bound {} exceeds 65535", argument, v),
            )
        })
    };
    entries
        .into_iter()
        .map(|entry| match entry.as_slice() {
            [v] => Ok(RangeEntry::Exact(bound(*v)?)),
            [lo, hi] => Ok(RangeEntry::Interval(bound(*lo)?, bound(*hi)?)),
            other => Err(OperandError::invalid_metadata(
                opcode,
                format!(
                    "operand argument '{}' validRange entry has {} elements, expected 1 or 2",
                    argument,
                    other.len()
                ),
            )),
        })
        .collect::<OperandResult<Vec<_>>>()
        .map(ValidRange::new)
}

/// Compile a computation if one is present and non-blank.
///
/// Syntax and binding errors name the opcode and `subject` (the argument or
/// computed arity that owns the expression).
fn compile_optional(
    opcode: &str,
    subject: &str,
    source: Option<String>,
    variable: Variable,
) -> OperandResult<Option<Computation>> {
    source
        .filter(|s| !s.trim().is_empty())
        .map(|s| Computation::compile(&s, variable))
        .transpose()
        .map_err(|err| err.in_context(opcode, subject))
}
