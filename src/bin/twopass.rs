//! twopass CLI tool - compile a source against a BNF grammar and list its tokens
//!
//! Usage: twopass [OPTIONS] <GRAMMAR> [INPUT]
//!
//! Arguments starting with `!` are taken literally, anything else is read as a
//! file path.

use clap::Parser;
use serde::Serialize;
use std::fs;
use std::process::ExitCode;
use twopass::{
    parse_bnf_grammar, CompileOptions, Compiler, ContextMask, ExecutePolicy, GrammarAnalysis,
    LexemeTable, ScannerConfig, TokenStream,
};

#[derive(Parser, Debug)]
#[command(
    name = "twopass",
    version,
    about = "Compile a source against a BNF grammar and list its tokens"
)]
struct Cli {
    /// The grammar in BNF notation (`!literal` or file name)
    grammar: String,

    /// The source to compile (`!literal` or file name)
    input: Option<String>,

    /// Print the token stream as JSON
    #[arg(long)]
    json: bool,

    /// Print the grammar's rule path rendered back into BNF
    #[arg(long)]
    bnf: bool,

    /// Print a grammar analysis report
    #[arg(long)]
    analyze: bool,

    /// Comment marker for the source; may be repeated (default: // ; #)
    #[arg(long = "comment", value_name = "MARKER")]
    comments: Vec<String>,

    /// Initial context mask
    #[arg(long, value_name = "MASK", default_value_t = u32::MAX)]
    context: u32,

    /// Ceiling for nested rule invocations
    #[arg(long, default_value_t = twopass::parse_context::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Abort after this many element attempts
    #[arg(long)]
    step_budget: Option<u64>,

    /// Print timing information
    #[arg(long)]
    timing: bool,

    /// Log grammar loading and compile progress
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonToken<'a> {
    index: usize,
    name: String,
    #[serde(flatten)]
    record: &'a twopass::TokenRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();

    let grammar_text = match read_arg(&cli.grammar) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let start = std::time::Instant::now();
    let mut grammar = match parse_bnf_grammar(&grammar_text, &LexemeTable::new()) {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("Grammar error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !cli.comments.is_empty() {
        grammar = grammar.with_scanner_config(ScannerConfig::new(cli.comments.clone()));
    }
    if cli.timing {
        eprintln!("Grammar loaded in {:?}", start.elapsed());
    }

    if cli.bnf {
        print!("{}", grammar.rule_path().to_bnf());
    }
    if cli.analyze {
        print!("{}", GrammarAnalysis::analyze(&grammar).report());
    }

    let Some(input) = &cli.input else {
        return ExitCode::SUCCESS;
    };
    let input_text = match read_arg(input) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let compiler = Compiler::new(grammar).with_options(CompileOptions {
        max_depth: cli.max_depth,
        step_budget: cli.step_budget,
        execute_policy: ExecutePolicy::Deferred,
        initial_context: ContextMask(cli.context),
    });

    let compile_start = std::time::Instant::now();
    let stream = match compiler.tokenize(&input_text) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if cli.timing {
        eprintln!("Input compiled in {:?}", compile_start.elapsed());
    }

    if cli.json {
        match serde_json::to_string_pretty(&json_tokens(&compiler, &stream)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("JSON error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_tokens(&compiler, &stream);
    }
    ExitCode::SUCCESS
}

fn read_arg(arg: &str) -> Result<String, String> {
    match arg.strip_prefix('!') {
        Some(literal) => Ok(literal.to_string()),
        None => fs::read_to_string(arg).map_err(|e| format!("Error reading {}: {}", arg, e)),
    }
}

fn json_tokens<'a>(compiler: &Compiler, stream: &'a TokenStream) -> Vec<JsonToken<'a>> {
    stream
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| JsonToken {
            index,
            name: compiler.grammar().token_name(record.token),
            record,
            value: stream.constant(index),
            label: stream.label(index),
        })
        .collect()
}

fn print_tokens(compiler: &Compiler, stream: &TokenStream) {
    for (index, record) in stream.records().iter().enumerate() {
        let name = compiler.grammar().token_name(record.token);
        let rule = compiler.grammar().token_name(record.rule);
        let detail = match (stream.constant(index), stream.label(index)) {
            (Some(value), _) => format!("\t{}", value),
            (None, Some(label)) => format!("\t{:?}", label),
            (None, None) => String::new(),
        };
        println!("{}:{}\t<{}>\t{}{}", record.line, record.offset, rule, name, detail);
    }
}
