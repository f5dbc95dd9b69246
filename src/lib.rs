/// opmeta - Opcode Operand Engine
///
/// This library packs named, logical operand arguments into the 16-bit
/// operand word attached to an opcode invocation, and reads them back. The
/// layout of the word, the permitted raw values, and the number of inputs and
/// outputs are all driven by per-opcode metadata.
///
/// # Architecture
///
/// The engine is a pipeline of small, pure stages:
///
/// 1. **Metadata** (`meta` module)
///    - JSON documents deserialized into validated `OpMeta` records
///    - Schema name patterns, argument overlap and computation checks at load
///    - `OpMetaTable` lookup by opcode name or alias
///
/// 2. **Computations** (`computation` module)
///    - Arithmetic over `bits` / `arg`: `+ - * / %`, parentheses, integers
///    - Parsed once per distinct string and cached
///    - Brute-force inversion over the argument width for encoding
///
/// 3. **Operands** (`operand` module)
///    - Bit-field pack/unpack, validRange checks, arity resolution
///    - `build`: logical values -> word; `read`: word -> logical values
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use opmeta::{build, read, OpMetaTable};
///
/// let table = OpMetaTable::from_json_str(r#"{
///     "name": "read-memory",
///     "operand": [
///         {"name": "index", "bits": [0, 7]},
///         {"name": "offset", "bits": [8, 15], "computation": "arg * 2"}
///     ],
///     "inputs": 0,
///     "outputs": 1
/// }"#).unwrap();
/// let meta = table.get("read-memory").unwrap();
///
/// let args = HashMap::from([("index".to_string(), 3), ("offset".to_string(), 10)]);
/// let word = build(meta, &args, 0).unwrap();
/// assert_eq!(word, 0x0503);
///
/// let decoded = read(meta, word).unwrap();
/// assert_eq!(decoded.arguments["offset"], 10);
/// ```
///
/// # Concurrency
///
/// Metadata is immutable once loaded and shared by reference. The parse cache
/// and the inversion memo are process-wide and safe to use from any thread.

pub mod computation;
pub mod config;
pub mod error;
pub mod meta;
pub mod operand;

pub use computation::{evaluate, Computation, Variable};
pub use config::EngineConfig;
pub use error::{ConfigError, ErrorKind, OperandError, OperandResult};
pub use meta::{
    InputParameter, InputSpec, OpMeta, OpMetaTable, OperandArgSpec, OperandSpec, OutputSpec,
    INPUTS_ARGUMENT,
};
pub use operand::{
    build, pack, read, render, resolve_inputs, resolve_outputs, unpack, validate, BitRange,
    DecodedOperand, InputArity, RangeEntry, ValidRange,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_and_read_from_json() {
        let meta: OpMeta = meta::OpMetaDocument::from_json_str(
            r#"{"name": "add", "operand": [{"name": "inputs", "bits": [0, 4]}],
                "inputs": {"bits": [0, 4]}, "outputs": 1}"#,
        )
        .unwrap()
        .try_into()
        .unwrap();
        let word = build(&meta, &HashMap::new(), 7).unwrap();
        assert_eq!(word, 7);
        let decoded = read(&meta, word).unwrap();
        assert_eq!(decoded.inputs.count, 7);
        assert_eq!(decoded.arguments[INPUTS_ARGUMENT], 7);
    }

    #[test]
    fn test_evaluate_reexport() {
        assert_eq!(evaluate("(bits + 1) * 1", Variable::Bits, 3), Ok(4));
    }
}
