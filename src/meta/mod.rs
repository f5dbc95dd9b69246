//! Opcode metadata model
//!
//! [`OpMeta`] is the validated, immutable contract of one opcode: how its
//! operand word is laid out, and how many inputs and outputs it has. Records
//! are produced from JSON documents (`document`), collected into an
//! [`OpMetaTable`] (`table`), and only ever read by the operand engine.

pub mod document;
pub mod table;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

pub use crate::operand::bits::BitRange;
pub use crate::operand::range::{RangeEntry, ValidRange};
pub use document::OpMetaDocument;
pub use table::OpMetaTable;

use crate::computation::{Computation, Variable};
use crate::error::{OperandError, OperandResult};

/// Reserved operand argument name whose value is the call-site input count
pub const INPUTS_ARGUMENT: &str = "inputs";

static OPCODE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][0-9A-Za-z\-_]*$").expect("opcode name pattern"));

static ARGUMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9\-_\s]*[A-Za-z0-9\-_]$").expect("argument name pattern")
});

/// One named, bit-ranged component of an operand
#[derive(Debug, Clone, PartialEq)]
pub struct OperandArgSpec {
    pub name: String,
    pub desc: Option<String>,
    pub bits: BitRange,
    /// Raw to logical transform over `arg`
    pub computation: Option<Computation>,
    /// Permitted raw (pre-computation) values
    pub valid_range: Option<ValidRange>,
}

impl OperandArgSpec {
    pub fn new(name: impl Into<String>, bits: BitRange) -> Self {
        OperandArgSpec {
            name: name.into(),
            desc: None,
            bits,
            computation: None,
            valid_range: None,
        }
    }

    pub fn with_computation(mut self, source: &str) -> OperandResult<Self> {
        self.computation = Some(Computation::compile(source, Variable::Arg)?);
        Ok(self)
    }

    pub fn with_valid_range(mut self, entries: Vec<RangeEntry>) -> Self {
        self.valid_range = Some(ValidRange::new(entries));
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Whether this is the reserved `inputs` argument
    pub fn is_inputs(&self) -> bool {
        self.name == INPUTS_ARGUMENT
    }
}

/// Layout of the operand word
#[derive(Debug, Clone, PartialEq)]
pub enum OperandSpec {
    /// No operand bits used; the word is always zero
    Zero,
    Args(Vec<OperandArgSpec>),
}

/// One declared input parameter of a fixed-arity opcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputParameter {
    pub name: String,
    pub desc: Option<String>,
    /// Variable-length: the call may supply more inputs than declared
    pub spread: bool,
}

impl InputParameter {
    pub fn new(name: impl Into<String>) -> Self {
        InputParameter {
            name: name.into(),
            desc: None,
            spread: false,
        }
    }

    pub fn spread(name: impl Into<String>) -> Self {
        InputParameter {
            spread: true,
            ..Self::new(name)
        }
    }
}

/// How an opcode's input count is determined
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// The `0` sentinel: no inputs
    None,
    Fixed(Vec<InputParameter>),
    /// Count read from operand bits, transformed over `bits`
    Computed {
        bits: BitRange,
        computation: Option<Computation>,
    },
}

/// How an opcode's output count is determined
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    Fixed(usize),
    /// Count read from operand bits, transformed over `bits`
    Computed {
        bits: BitRange,
        computation: Option<Computation>,
    },
}

/// Which arity a computed bit range belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityField {
    Inputs,
    Outputs,
}

impl ArityField {
    pub fn name(&self) -> &'static str {
        match self {
            ArityField::Inputs => "inputs",
            ArityField::Outputs => "outputs",
        }
    }
}

/// An operand argument sharing bits with a computed arity range.
///
/// Shared encoding is legal (typically the `inputs` argument and computed
/// inputs read the same bits); it is reported, never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitOverlap {
    pub argument: String,
    pub argument_bits: BitRange,
    pub arity: ArityField,
    pub arity_bits: BitRange,
}

/// One opcode's full metadata contract
#[derive(Debug, Clone, PartialEq)]
pub struct OpMeta {
    pub name: String,
    pub desc: String,
    pub operand: OperandSpec,
    pub inputs: InputSpec,
    pub outputs: OutputSpec,
    pub aliases: Vec<String>,
}

impl OpMeta {
    /// Assemble and validate an opcode record
    pub fn new(
        name: impl Into<String>,
        operand: OperandSpec,
        inputs: InputSpec,
        outputs: OutputSpec,
    ) -> OperandResult<Self> {
        Self::from_parts(name.into(), String::new(), operand, inputs, outputs, Vec::new())
    }

    pub(crate) fn from_parts(
        name: String,
        desc: String,
        operand: OperandSpec,
        inputs: InputSpec,
        outputs: OutputSpec,
        aliases: Vec<String>,
    ) -> OperandResult<Self> {
        let meta = OpMeta {
            name,
            desc,
            operand,
            inputs,
            outputs,
            aliases,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> OperandResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    /// Operand arguments in declaration order (empty for the zero sentinel)
    pub fn operand_args(&self) -> &[OperandArgSpec] {
        match &self.operand {
            OperandSpec::Zero => &[],
            OperandSpec::Args(args) => args,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&OperandArgSpec> {
        self.operand_args().iter().find(|arg| arg.name == name)
    }

    /// Primary name followed by aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Operand arguments whose bits are shared with a computed arity range
    pub fn bit_overlaps(&self) -> Vec<BitOverlap> {
        let arity_ranges = [
            match &self.inputs {
                InputSpec::Computed { bits, .. } => Some((ArityField::Inputs, *bits)),
                _ => None,
            },
            match &self.outputs {
                OutputSpec::Computed { bits, .. } => Some((ArityField::Outputs, *bits)),
                _ => None,
            },
        ];
        let mut overlaps = Vec::new();
        for arg in self.operand_args() {
            for (arity, arity_bits) in arity_ranges.iter().flatten() {
                if arg.bits.overlaps(arity_bits) {
                    overlaps.push(BitOverlap {
                        argument: arg.name.clone(),
                        argument_bits: arg.bits,
                        arity: *arity,
                        arity_bits: *arity_bits,
                    });
                }
            }
        }
        overlaps
    }

    /// Check the schema constraints that cannot be expressed in the types
    pub fn validate(&self) -> OperandResult<()> {
        let invalid = |reason: String| OperandError::invalid_metadata(&self.name, reason);

        for name in self.names() {
            if !OPCODE_NAME.is_match(name) {
                return Err(invalid(format!("'{}' is not a valid opcode name or alias", name)));
            }
        }

        let args = self.operand_args();
        let mut seen = HashSet::new();
        for (i, arg) in args.iter().enumerate() {
            if !ARGUMENT_NAME.is_match(&arg.name) {
                return Err(invalid(format!("'{}' is not a valid operand argument name", arg.name)));
            }
            if !seen.insert(arg.name.as_str()) {
                return Err(invalid(format!("operand argument '{}' is declared twice", arg.name)));
            }
            if let Some(other) = args[..i].iter().find(|other| other.bits.overlaps(&arg.bits)) {
                return Err(invalid(format!(
                    "operand argument '{}' bits {} overlap argument '{}' bits {}",
                    arg.name, arg.bits, other.name, other.bits
                )));
            }
            check_variable(&self.name, arg.computation.as_ref(), Variable::Arg)?;
            if let Some(range) = &arg.valid_range {
                check_valid_range(&self.name, &arg.name, range)?;
            }
        }

        match &self.inputs {
            InputSpec::None => {}
            InputSpec::Fixed(parameters) => {
                for (i, param) in parameters.iter().enumerate() {
                    if !ARGUMENT_NAME.is_match(&param.name) {
                        return Err(invalid(format!(
                            "'{}' is not a valid input parameter name",
                            param.name
                        )));
                    }
                    if param.spread && i + 1 != parameters.len() {
                        return Err(invalid(format!(
                            "only the last input parameter may be spread, not '{}'",
                            param.name
                        )));
                    }
                }
            }
            InputSpec::Computed { computation, .. } => {
                check_variable(&self.name, computation.as_ref(), Variable::Bits)?;
            }
        }
        if let OutputSpec::Computed { computation, .. } = &self.outputs {
            check_variable(&self.name, computation.as_ref(), Variable::Bits)?;
        }

        for overlap in self.bit_overlaps() {
            debug!(
                target: "opmeta::meta",
                opcode = %self.name,
                argument = %overlap.argument,
                argument_bits = %overlap.argument_bits,
                arity = overlap.arity.name(),
                arity_bits = %overlap.arity_bits,
                "Operand argument shares bits with computed arity"
            );
        }
        Ok(())
    }
}

fn check_variable(opcode: &str, computation: Option<&Computation>, expected: Variable) -> OperandResult<()> {
    match computation {
        Some(c) if c.variable() != expected => Err(OperandError::invalid_metadata(
            opcode,
            format!(
                "computation '{}' is bound to '{}' but must use '{}'",
                c.source(),
                c.variable(),
                expected
            ),
        )),
        _ => Ok(()),
    }
}

fn check_valid_range(opcode: &str, argument: &str, range: &ValidRange) -> OperandResult<()> {
    if range.entries().is_empty() {
        return Err(OperandError::invalid_metadata(
            opcode,
            format!("operand argument '{}' has an empty validRange", argument),
        ));
    }
    for entry in range.entries() {
        if let RangeEntry::Interval(lo, hi) = entry {
            if lo > hi {
                return Err(OperandError::invalid_metadata(
                    opcode,
                    format!("operand argument '{}' validRange entry {} has min above max", argument, entry),
                ));
            }
        }
    }
    Ok(())
}
