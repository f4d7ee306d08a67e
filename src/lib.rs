//! twopass - Grammar-driven two pass compiler core
//!
//! Pass 1 tokenizes and syntax-checks a source against a grammar given either
//! as BNF text or as a hand-built rule path. Pass 2 walks the resulting token
//! stream and dispatches client actions for the tokens that carry one.
//!
//! # Quick Start
//!
//! ```rust
//! use twopass::{parse_bnf_grammar, ActionMap, Compiler, LexemeTable, TokenCursor, TokenId};
//!
//! let mut lexemes = LexemeTable::new();
//! lexemes.add("sum", 1, true);
//!
//! let grammar = parse_bnf_grammar(
//!     "<program> ::= {<statement>} ;
//!      <statement> ::= 'sum' <#a> <#b> ;",
//!     &lexemes,
//! )
//! .expect("Invalid grammar");
//!
//! let mut total = 0.0;
//! let mut actions = ActionMap::new();
//! actions.insert(TokenId::User(1), |cursor: &mut TokenCursor<'_>| {
//!     total += cursor.next_token_value()? + cursor.next_token_value()?;
//!     Ok(())
//! });
//!
//! Compiler::new(grammar)
//!     .compile("sum 1 2\nsum 3.5 4", &mut actions)
//!     .expect("Compile failed");
//! drop(actions);
//! assert_eq!(total, 10.5);
//! ```
//!
//! # Features
//!
//! - BNF grammars compiled by a built-in BNF grammar
//! - Context masks for tokens that share spellings
//! - Labels, numeric constants and whitespace-sensitive terminals
//! - Interleaved or deferred pass 2
//! - WebAssembly support for browser use

pub mod bootstrap;
pub mod charclass;
pub mod compiler;
pub mod grammar;
pub mod grammar_analysis;
pub mod grammar_parser;
pub mod input_stream;
mod interpreter;
pub mod lexemes;
pub mod parse_context;
pub mod pass2;
pub mod rule_path;
pub mod symbols;
pub mod token_stream;

// WASM bindings (only when compiling for wasm32)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export main API
pub use compiler::Compiler;
pub use grammar::{Grammar, GrammarError};
pub use grammar_analysis::GrammarAnalysis;
pub use grammar_parser::{build_rule_path, parse_bnf_grammar};
pub use input_stream::ScannerConfig;
pub use lexemes::LexemeTable;
pub use parse_context::{CompileError, CompileOptions, ExecutePolicy, SyntaxError};
pub use pass2::{ActionError, ActionMap, NoActions, Pass2Actions, Pass2Error, TokenCursor};
pub use rule_path::{RuleOp, RulePath, RulePathBuilder, Term};
pub use symbols::{ContextMask, ContextRule, SymbolTable, TokenId};
pub use token_stream::{TokenRecord, TokenStream};

// Re-export WASM API for convenience
#[cfg(target_arch = "wasm32")]
pub use wasm::*;
