//! WebAssembly bindings for twopass
//!
//! JavaScript-friendly wrappers around BNF grammar loading and pass 1.
//! Only compiled when targeting wasm32.

#![cfg(target_arch = "wasm32")]

use crate::grammar_analysis::GrammarAnalysis;
use crate::{parse_bnf_grammar, Compiler, LexemeTable, ScannerConfig, TokenStream};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Set panic hook for better error messages in browser
#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

// Use smaller allocator for WASM
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// One token as handed to JavaScript
#[derive(Serialize)]
struct JsToken {
    name: String,
    line: usize,
    offset: usize,
    value: Option<f64>,
    label: Option<String>,
}

fn js_tokens(compiler: &Compiler, stream: &TokenStream) -> Vec<JsToken> {
    stream
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| JsToken {
            name: compiler.grammar().token_name(record.token),
            line: record.line,
            offset: record.offset,
            value: stream.constant(index),
            label: stream.label(index).map(str::to_string),
        })
        .collect()
}

/// Result type for JavaScript interop
#[wasm_bindgen]
#[derive(Debug)]
pub struct TokenizeResult {
    success: bool,
    tokens: JsValue,
    error: Option<String>,
}

#[wasm_bindgen]
impl TokenizeResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Array of `{ name, line, offset, value, label }` objects
    #[wasm_bindgen(getter)]
    pub fn tokens(&self) -> JsValue {
        self.tokens.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

/// WASM-friendly tokenizer over a BNF grammar
#[wasm_bindgen]
pub struct TwoPassParser {
    compiler: Compiler,
}

#[wasm_bindgen]
impl TwoPassParser {
    /// Create a new tokenizer from BNF grammar text
    #[wasm_bindgen(constructor)]
    pub fn new(grammar: &str) -> Result<TwoPassParser, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        set_panic_hook();

        let grammar = parse_bnf_grammar(grammar, &LexemeTable::new())
            .map_err(|e| JsValue::from_str(&format!("Grammar error: {}", e)))?;

        Ok(TwoPassParser {
            compiler: Compiler::new(grammar),
        })
    }

    /// Replace the comment markers, e.g. `["//", "#"]`
    pub fn set_comment_markers(&mut self, markers: Vec<String>) {
        let grammar = self
            .compiler
            .grammar()
            .clone()
            .with_scanner_config(ScannerConfig::new(markers));
        self.compiler = Compiler::new(grammar).with_options(self.compiler.options().clone());
    }

    /// Run pass 1 over the input
    pub fn tokenize(&self, input: &str) -> TokenizeResult {
        match self.compiler.tokenize(input) {
            Ok(stream) => {
                let tokens = js_tokens(&self.compiler, &stream);
                match serde_wasm_bindgen::to_value(&tokens) {
                    Ok(tokens) => TokenizeResult {
                        success: true,
                        tokens,
                        error: None,
                    },
                    Err(e) => TokenizeResult {
                        success: false,
                        tokens: JsValue::NULL,
                        error: Some(e.to_string()),
                    },
                }
            }
            Err(e) => TokenizeResult {
                success: false,
                tokens: JsValue::NULL,
                error: Some(e.to_string()),
            },
        }
    }

    /// Get the number of rules in the grammar (for debugging)
    pub fn rule_count(&self) -> usize {
        self.compiler.grammar().productions().len()
    }

    /// Grammar rendered back into BNF
    pub fn rule_path_bnf(&self) -> String {
        self.compiler.grammar().rule_path().to_bnf()
    }

    /// Human-readable grammar analysis
    pub fn analysis_report(&self) -> String {
        GrammarAnalysis::analyze(self.compiler.grammar()).report()
    }
}

/// Convenience function: load grammar and tokenize input in one step
#[wasm_bindgen]
pub fn tokenize(grammar: &str, input: &str) -> TokenizeResult {
    match TwoPassParser::new(grammar) {
        Ok(parser) => parser.tokenize(input),
        Err(e) => TokenizeResult {
            success: false,
            tokens: JsValue::NULL,
            error: Some(format!("{:?}", e)),
        },
    }
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
