//! Operand engine
//!
//! - `bits` - pack/unpack of inclusive bit ranges in the 16-bit word
//! - `range` - validRange membership
//! - `arity` - fixed and computed input/output counts
//! - `builder` - logical argument values to operand word
//! - `reader` - operand word back to logical values

pub mod arity;
pub mod bits;
pub mod builder;
pub mod range;
pub mod reader;

pub use arity::{resolve_inputs, resolve_outputs, InputArity};
pub use bits::{pack, unpack, BitRange, WORD_BITS};
pub use builder::build;
pub use range::{validate, RangeEntry, ValidRange};
pub use reader::{read, render, DecodedOperand};
