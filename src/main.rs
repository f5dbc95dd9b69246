/// opmeta - Opcode Operand Engine CLI
use opmeta::config::{self, EngineConfig};
use opmeta::{build, read, render, OpMeta, OpMetaTable, OperandSpec};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::process;
use tracing::Level;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for engine and metadata errors
const EXIT_FAILURE: i32 = 1;
/// Exit status for command-line mistakes
const EXIT_USAGE: i32 = 2;

fn print_usage() {
    eprintln!("opmeta v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    opmeta [OPTIONS] <COMMAND> <META> [ARGS...]");
    eprintln!();
    eprintln!("COMMANDS:");
    eprintln!("    build <META> <OPCODE> [NAME=VALUE ...] [--inputs N]");
    eprintln!("                         Encode argument values into an operand word");
    eprintln!("    read <META> <OPCODE> <WORD>");
    eprintln!("                         Decode an operand word");
    eprintln!("    render <META> <OPCODE> <WORD>");
    eprintln!("                         Print an operand as name<v1 v2 ...>");
    eprintln!("    list <META>          List opcodes and their operand layouts");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help           Print this help message");
    eprintln!("    -V, --version        Print version information");
    eprintln!("    -v, --verbose        Raise log verbosity (repeatable)");
    eprintln!("    --config <FILE>      Load engine settings from a TOML file");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <META>               Opcode metadata JSON (one object or an array)");
    eprintln!("    <WORD>               Operand word, decimal or 0x-prefixed hex");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    opmeta build ops.json read-memory index=3 offset=10");
    eprintln!("    opmeta read ops.json read-memory 0x0503");
    eprintln!("    opmeta -vv list ops.json");
}

fn print_version() {
    println!("opmeta {}", VERSION);
}

enum Command {
    Build {
        opcode: String,
        args: HashMap<String, i64>,
        inputs: usize,
    },
    Read {
        opcode: String,
        word: u16,
    },
    Render {
        opcode: String,
        word: u16,
    },
    List,
}

struct Options {
    verbosity: u8,
    config: Option<String>,
    meta: String,
    command: Command,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut verbosity = 0u8;
    let mut config = None;
    let mut inputs = None;
    let mut positional = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-v" | "--verbose" => {
                verbosity = verbosity.saturating_add(1);
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing file after --config".to_string());
                }
                config = Some(args[i].clone());
            }
            "--inputs" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing count after --inputs".to_string());
                }
                inputs = Some(
                    args[i]
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid input count: {}", args[i]))?,
                );
            }
            // -vv, -vvv
            arg if arg.len() > 2 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((arg.len() - 1) as u8);
            }
            arg if arg.starts_with('-') && arg.parse::<i64>().is_err() => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let name = positional.next().ok_or("Missing command")?;
    let meta = positional.next().ok_or("Missing metadata file")?;
    let rest: Vec<String> = positional.collect();

    if inputs.is_some() && name != "build" {
        return Err("--inputs only applies to the build command".to_string());
    }

    let command = match (name.as_str(), rest.as_slice()) {
        ("build", [opcode, pairs @ ..]) => Command::Build {
            opcode: opcode.clone(),
            args: pairs.iter().map(|pair| parse_pair(pair)).collect::<Result<_, _>>()?,
            inputs: inputs.unwrap_or(0),
        },
        ("read", [opcode, word]) => Command::Read {
            opcode: opcode.clone(),
            word: parse_word(word)?,
        },
        ("render", [opcode, word]) => Command::Render {
            opcode: opcode.clone(),
            word: parse_word(word)?,
        },
        ("list", []) => Command::List,
        ("build" | "read" | "render" | "list", _) => {
            return Err(format!("Wrong number of arguments for '{}'", name))
        }
        (other, _) => return Err(format!("Unknown command: {}", other)),
    };

    Ok(Options {
        verbosity,
        config,
        meta,
        command,
    })
}

fn parse_pair(pair: &str) -> Result<(String, i64), String> {
    let (name, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("Expected NAME=VALUE, got '{}'", pair))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("Invalid value for '{}': {}", name, value))?;
    Ok((name.trim().to_string(), value))
}

fn parse_word(text: &str) -> Result<u16, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|_| format!("Invalid operand word: {}", text))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_table(path: &str) -> Result<OpMetaTable, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read metadata '{}': {}", path, e))?;
    OpMetaTable::from_json_str(&text).map_err(|e| e.to_string())
}

fn lookup<'a>(table: &'a OpMetaTable, opcode: &str) -> Result<&'a OpMeta, String> {
    table
        .get(opcode)
        .map(|meta| meta.as_ref())
        .ok_or_else(|| format!("Unknown opcode: {}", opcode))
}

fn describe(meta: &OpMeta) -> String {
    let mut out = meta.name.clone();
    if !meta.aliases.is_empty() {
        out.push_str(&format!(" (aliases: {})", meta.aliases.join(", ")));
    }
    match &meta.operand {
        OperandSpec::Zero => out.push_str("\n    operand: 0"),
        OperandSpec::Args(args) => {
            for arg in args {
                out.push_str(&format!("\n    {} bits {}", arg.name, arg.bits));
                if let Some(computation) = &arg.computation {
                    out.push_str(&format!(" computation '{}'", computation));
                }
                if let Some(range) = &arg.valid_range {
                    out.push_str(&format!(" validRange {}", range));
                }
            }
        }
    }
    out
}

fn run(options: &Options) -> Result<String, String> {
    let table = load_table(&options.meta)?;
    match &options.command {
        Command::Build { opcode, args, inputs } => {
            let word = build(lookup(&table, opcode)?, args, *inputs).map_err(|e| e.to_string())?;
            Ok(format!("0x{:04x} ({})", word, word))
        }
        Command::Read { opcode, word } => {
            let meta = lookup(&table, opcode)?;
            let decoded = read(meta, *word).map_err(|e| e.to_string())?;
            let mut out = String::new();
            for (name, value) in &decoded.arguments {
                out.push_str(&format!("{} = {}\n", name, value));
            }
            out.push_str(&format!("inputs: {}\noutputs: {}", decoded.inputs, decoded.outputs));
            Ok(out)
        }
        Command::Render { opcode, word } => render(lookup(&table, opcode)?, *word).map_err(|e| e.to_string()),
        Command::List => Ok(table.iter().map(|meta| describe(meta)).collect::<Vec<_>>().join("\n")),
    }
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(EXIT_USAGE);
        }
    };

    init_logging(options.verbosity);

    if let Some(path) = &options.config {
        match EngineConfig::from_file(path) {
            Ok(loaded) => {
                if config::install(loaded).is_err() {
                    eprintln!("Error: engine configuration was already initialized");
                    process::exit(EXIT_FAILURE);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(EXIT_FAILURE);
            }
        }
    }

    match run(&options) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILURE);
        }
    }
}
