//! Computation evaluator
//!
//! Opcode metadata attaches small arithmetic expressions to operand bit fields:
//! `"(bits + 1) * 2"` turns the raw bits of a computed arity into a count, and
//! `"arg + 1"` turns a raw operand argument into its logical value. This module
//! is the mini-interpreter for that language:
//!
//! 1. **Lexing** (`lexer`) - integers, the bound variable, `+ - * / %`, parentheses
//! 2. **Parsing** (`parser`) - recursive descent into an [`Expr`] tree, parsed
//!    once per distinct string and cached (`cache`)
//! 3. **Evaluation** - checked `i64` arithmetic; division truncates toward zero
//! 4. **Inversion** (`inverse`) - bounded brute-force search used on the encode
//!    path, memoized across threads

pub mod cache;
pub mod inverse;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::sync::Arc;

pub use inverse::{InverseCache, Inversion};
pub use parser::{BinaryOp, Expr, Fault};

use crate::error::{OperandError, OperandResult};

/// The single identifier a computation may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// `bits`, the value extracted for a computed input/output arity
    Bits,
    /// `arg`, the value of an operand argument
    Arg,
}

impl Variable {
    pub fn name(&self) -> &'static str {
        match self {
            Variable::Bits => "bits",
            Variable::Arg => "arg",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed computation bound to its variable.
///
/// Cloning is cheap: the source and tree are shared.
#[derive(Debug, Clone)]
pub struct Computation {
    source: Arc<str>,
    variable: Variable,
    expr: Arc<Expr>,
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable && self.source == other.source
    }
}

impl Eq for Computation {}

impl Computation {
    /// Parse `source` (through the shared parse cache)
    pub fn compile(source: &str, variable: Variable) -> OperandResult<Self> {
        let expr = cache::parse_cached(source, variable).map_err(|message| {
            OperandError::Evaluation {
                expression: source.to_string(),
                message,
            }
        })?;
        Ok(Computation {
            source: Arc::from(source),
            variable,
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate with the bound variable set to `value`
    pub fn apply(&self, value: i64) -> OperandResult<i64> {
        self.expr.eval(value).map_err(|fault| self.arithmetic_error(fault))
    }

    /// All raw values of `width` bits that this computation maps to `target`.
    ///
    /// Candidates that fail to evaluate are skipped; if every candidate fails,
    /// the first failure is returned as an `Arithmetic` error.
    pub fn invert(&self, target: i64, width: u8) -> OperandResult<inverse::Matches> {
        match InverseCache::global().invert(&self.source, self.variable, &self.expr, target, width) {
            Inversion::Found(matches) => Ok(matches),
            Inversion::Failed(fault) => Err(self.arithmetic_error(fault)),
        }
    }

    fn arithmetic_error(&self, fault: Fault) -> OperandError {
        OperandError::Arithmetic {
            expression: self.source.to_string(),
            message: fault.to_string(),
        }
    }
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Apply an optional computation; `None` is the identity
pub fn apply_optional(computation: Option<&Computation>, value: i64) -> OperandResult<i64> {
    match computation {
        Some(computation) => computation.apply(value),
        None => Ok(value),
    }
}

/// Evaluate `expression` with `variable` bound to `value`
pub fn evaluate(expression: &str, variable: Variable, value: i64) -> OperandResult<i64> {
    Computation::compile(expression, variable)?.apply(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_evaluate_computed_arity_example() {
        assert_eq!(evaluate("(bits + 1) * 1", Variable::Bits, 3), Ok(4));
        assert_eq!(evaluate("(bits + 1) * 2", Variable::Bits, 3), Ok(8));
    }

    #[test]
    fn test_evaluate_division_by_zero_is_arithmetic_error() {
        for arg in [0, 1, 7, 65535] {
            let err = evaluate("arg / 0", Variable::Arg, arg).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Arithmetic);
        }
        let err = evaluate("arg % 0", Variable::Arg, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn test_evaluate_unknown_identifier_is_evaluation_error() {
        let err = evaluate("x + 1", Variable::Arg, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert!(err.to_string().contains("'x'"));
        // `bits` is unbound in an argument computation
        let err = evaluate("bits + 1", Variable::Arg, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }

    #[test]
    fn test_evaluate_malformed_is_evaluation_error() {
        let err = evaluate("arg + ", Variable::Arg, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        for value in 0..64 {
            let a = evaluate("(arg * 7 + 3) % 11 - arg / 3", Variable::Arg, value);
            let b = evaluate("(arg * 7 + 3) % 11 - arg / 3", Variable::Arg, value);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_apply_optional_identity() {
        assert_eq!(apply_optional(None, 42), Ok(42));
        let double = Computation::compile("arg * 2", Variable::Arg).unwrap();
        assert_eq!(apply_optional(Some(&double), 21), Ok(42));
    }

    #[test]
    fn test_invert_through_global_cache() {
        let computation = Computation::compile("arg + 3", Variable::Arg).unwrap();
        assert_eq!(&*computation.invert(10, 4).unwrap(), &[7]);
        let always_fails = Computation::compile("arg / 0", Variable::Arg).unwrap();
        assert_eq!(
            always_fails.invert(1, 2).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
    }

    #[test]
    fn test_computation_equality_ignores_tree_identity() {
        let a = Computation::compile("arg + 1", Variable::Arg).unwrap();
        let b = Computation::compile("arg + 1", Variable::Arg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "arg + 1");
    }
}
