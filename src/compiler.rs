//! Compiler entry point
//!
//! A [`Compiler`] pairs a loaded grammar with compile options. The grammar is
//! shared behind an `Arc` and is never mutated by a compile, so one compiler
//! may serve any number of sources, also from several threads at once.

use crate::grammar::Grammar;
use crate::interpreter::Interpreter;
use crate::parse_context::{CompileError, CompileOptions};
use crate::pass2::{NoActions, Pass2Actions};
use crate::token_stream::TokenStream;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Compiler {
    grammar: Arc<Grammar>,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(grammar: impl Into<Arc<Grammar>>) -> Self {
        Compiler {
            grammar: grammar.into(),
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Run both passes over `source`
    ///
    /// Pass 1 must accept the whole source; trailing non-whitespace, non-comment
    /// text is a syntax error. Pass 2 dispatches `actions` for every actionable
    /// token, either at each `EndAndExecute` production or once pass 1 is done.
    pub fn compile<A: Pass2Actions + ?Sized>(
        &self,
        source: &str,
        actions: &mut A,
    ) -> Result<TokenStream, CompileError> {
        log::debug!("compiling {} bytes", source.len());
        Interpreter::new(&self.grammar, source, &self.options, actions).run()
    }

    /// Run pass 1 only and return the token stream
    pub fn tokenize(&self, source: &str) -> Result<TokenStream, CompileError> {
        self.compile(source, &mut NoActions)
    }

    /// Returns true if pass 1 accepts `source`
    pub fn accepts(&self, source: &str) -> bool {
        self.tokenize(source).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_path::RulePathBuilder;
    use crate::symbols::SymbolTable;

    fn compiler() -> Compiler {
        let mut symbols = SymbolTable::new();
        symbols.define_nonterminal(1);
        symbols.define_terminal(10, false);
        let path = RulePathBuilder::new().rule(1, "s").repeat((10, "ab")).end().build();
        Compiler::new(Grammar::new(path, symbols).unwrap())
    }

    #[test]
    fn test_accepts() {
        let compiler = compiler();
        assert!(compiler.accepts("ab ab // comment"));
        assert!(compiler.accepts(""));
        assert!(!compiler.accepts("ab ac"));
    }

    #[test]
    fn test_shared_between_threads() {
        let compiler = Arc::new(compiler());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let compiler = Arc::clone(&compiler);
                std::thread::spawn(move || compiler.tokenize(&"ab ".repeat(n)).map(|s| s.len()))
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().unwrap(), n);
        }
    }
}
