//! Grammar loading: rule path validation and lowering into productions
//!
//! The flat rule path is checked against the symbol table and lowered into a
//! tree of productions. Each production holds its alternatives in table order,
//! and every element already knows whether it refers to another production, a
//! literal, a character set or one of the system tokens. Pass 1 never searches
//! the rule path at compile time.

use crate::charclass::RangeSet;
use crate::grammar_analysis::GrammarAnalysis;
use crate::input_stream::ScannerConfig;
use crate::parse_context::CompileError;
use crate::pass2::Pass2Error;
use crate::rule_path::{RuleOp, RulePath, Term};
use crate::symbols::{init_symbol_type_lib, SymbolTable, TokenId};
use thiserror::Error;

/// Error type for rejected grammars
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("grammar has no rules")]
    EmptyGrammar,

    #[error("token {token} is not in the symbol table")]
    UnknownToken { token: TokenId, index: Option<usize> },

    #[error("rule <{name}> is defined twice (rule op {index})")]
    DuplicateRule { name: String, index: usize },

    #[error("nonterminal {token} is used but has no rule")]
    UndefinedRule { token: TokenId },

    #[error("rule op {index} appears outside of a rule")]
    OpOutsideRule { index: usize },

    #[error("rule <{name}> is missing its end marker")]
    UnterminatedRule { name: String },

    #[error("system token {token} cannot head a rule (rule op {index})")]
    SystemTokenRule { token: TokenId, index: usize },

    #[error("terminal {token} has no literal text (rule op {index})")]
    MissingLiteral { token: TokenId, index: usize },

    #[error("empty literal at line {line}")]
    EmptyLiteral { line: usize },

    #[error("alternative at line {line} must start with a required term")]
    ModifierAfterOr { line: usize },

    #[error("no token id left for {lexeme}")]
    IdSpaceExhausted { lexeme: String },

    #[error("BNF grammar did not compile: {0}")]
    Bnf(#[source] CompileError),

    #[error("malformed BNF token stream: {0}")]
    Malformed(#[from] Pass2Error),
}

/// How often an element may match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required,
    Optional,
    Repeat,
    /// Zero-width: the alternative fails if the element matches
    NotTest,
}

/// What an element matches
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Index into [`Grammar::productions`]
    NonTerminal(usize),
    Literal { text: String, case_sensitive: bool },
    CharSet(RangeSet),
    Value,
    NoSpaceSkip,
}

/// One element of an alternative
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub token: TokenId,
    /// Slot of `token` in the symbol table
    pub slot: usize,
    pub repetition: Repetition,
    pub symbol: Symbol,
}

impl Element {
    /// Short description used in syntax errors
    pub fn describe(&self, grammar: &Grammar) -> String {
        match &self.symbol {
            Symbol::NonTerminal(index) => format!("<{}>", grammar.productions[*index].name),
            Symbol::Literal { text, .. } => format!("'{}'", text),
            Symbol::CharSet(set) => format!("({})", set.to_literal()),
            Symbol::Value => "number".to_string(),
            Symbol::NoSpaceSkip => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alternative {
    pub elements: Vec<Element>,
}

/// Lowered rule
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub token: TokenId,
    pub name: String,
    /// Position of the `Rule` header in the rule path
    pub rule_index: usize,
    pub alternatives: Vec<Alternative>,
    /// Success triggers pass 2
    pub execute: bool,
}

/// Validated, lowered grammar ready for compiling sources
#[derive(Debug, Clone)]
pub struct Grammar {
    rule_path: RulePath,
    symbols: SymbolTable,
    productions: Vec<Production>,
    scanner: ScannerConfig,
}

impl Grammar {
    /// Validate and lower a rule path; the first rule is the start rule
    pub fn new(rule_path: RulePath, mut symbols: SymbolTable) -> Result<Self, GrammarError> {
        if rule_path.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        init_symbol_type_lib(&rule_path, &mut symbols)?;

        let mut productions: Vec<Production> = Vec::new();
        let mut production_of_rule = std::collections::HashMap::new();
        for (index, op) in rule_path.ops().iter().enumerate() {
            if let RuleOp::Rule { .. } = op {
                production_of_rule.insert(index, production_of_rule.len());
            }
        }

        let mut open: Option<Production> = None;
        for (index, op) in rule_path.ops().iter().enumerate() {
            match op {
                RuleOp::Rule { token, name } => {
                    if let Some(unfinished) = open.take() {
                        return Err(GrammarError::UnterminatedRule { name: unfinished.name });
                    }
                    if token.is_system() {
                        return Err(GrammarError::SystemTokenRule { token: *token, index });
                    }
                    open = Some(Production {
                        token: *token,
                        name: name.clone(),
                        rule_index: index,
                        alternatives: vec![Alternative::default()],
                        execute: false,
                    });
                }
                RuleOp::End | RuleOp::EndAndExecute => {
                    let mut production = open.take().ok_or(GrammarError::OpOutsideRule { index })?;
                    production.execute = matches!(op, RuleOp::EndAndExecute);
                    productions.push(production);
                }
                RuleOp::And(term)
                | RuleOp::Or(term)
                | RuleOp::Optional(term)
                | RuleOp::Repeat(term)
                | RuleOp::NotTest(term) => {
                    let production = open.as_mut().ok_or(GrammarError::OpOutsideRule { index })?;
                    let repetition = match op {
                        RuleOp::Optional(_) => Repetition::Optional,
                        RuleOp::Repeat(_) => Repetition::Repeat,
                        RuleOp::NotTest(_) => Repetition::NotTest,
                        _ => Repetition::Required,
                    };
                    if let RuleOp::Or(_) = op {
                        production.alternatives.push(Alternative::default());
                    }
                    let element = lower_term(
                        term,
                        repetition,
                        index,
                        &rule_path,
                        &symbols,
                        &production_of_rule,
                    )?;
                    if let Some(alternative) = production.alternatives.last_mut() {
                        alternative.elements.push(element);
                    }
                }
            }
        }
        if let Some(unfinished) = open {
            return Err(GrammarError::UnterminatedRule { name: unfinished.name });
        }

        let grammar = Grammar {
            rule_path,
            symbols,
            productions,
            scanner: ScannerConfig::default(),
        };
        let analysis = GrammarAnalysis::analyze(&grammar);
        for name in &analysis.left_recursive_rules {
            log::warn!("rule <{}> is left recursive and will hit the depth limit", name);
        }
        for name in &analysis.unreachable_rules {
            log::debug!("rule <{}> is unreachable from <{}>", name, grammar.productions[0].name);
        }
        Ok(grammar)
    }

    /// Replace the comment markers used when scanning sources
    pub fn with_scanner_config(mut self, scanner: ScannerConfig) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn rule_path(&self) -> &RulePath {
        &self.rule_path
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn scanner_config(&self) -> &ScannerConfig {
        &self.scanner
    }

    /// Production of the start rule
    pub fn start(&self) -> &Production {
        &self.productions[0]
    }

    pub fn production_for(&self, token: TokenId) -> Option<&Production> {
        self.productions.iter().find(|production| production.token == token)
    }

    /// Readable name of a token: rule name, default text or the raw id
    pub fn token_name(&self, token: TokenId) -> String {
        let info = match self.symbols.get(token) {
            Some(info) if !token.is_system() => info,
            _ => return token.to_string(),
        };
        info.rule_index
            .or(info.default_text_index)
            .and_then(|index| self.rule_path.get(index))
            .and_then(RuleOp::literal)
            .map(str::to_string)
            .unwrap_or_else(|| token.to_string())
    }
}

fn lower_term(
    term: &Term,
    repetition: Repetition,
    index: usize,
    path: &RulePath,
    symbols: &SymbolTable,
    production_of_rule: &std::collections::HashMap<usize, usize>,
) -> Result<Element, GrammarError> {
    let slot = symbols
        .slot_of(term.token)
        .ok_or(GrammarError::UnknownToken { token: term.token, index: Some(index) })?;
    let info = symbols.by_slot(slot);
    let missing = || GrammarError::MissingLiteral { token: term.token, index };

    let symbol = match term.token {
        TokenId::Value => Symbol::Value,
        TokenId::NoSpaceSkip => Symbol::NoSpaceSkip,
        TokenId::Character => {
            let members = term
                .literal
                .as_deref()
                .filter(|text| !text.is_empty())
                .ok_or_else(missing)?;
            Symbol::CharSet(RangeSet::from_chars(members))
        }
        TokenId::NoToken | TokenId::User(_) => match info.rule_index {
            Some(rule) if term.token != TokenId::NoToken => {
                let production = production_of_rule
                    .get(&rule)
                    .copied()
                    .ok_or(GrammarError::UndefinedRule { token: term.token })?;
                Symbol::NonTerminal(production)
            }
            _ => {
                // fall back to the token's default text
                let text = term
                    .literal
                    .as_deref()
                    .or_else(|| {
                        info.default_text_index
                            .and_then(|i| path.get(i))
                            .and_then(RuleOp::literal)
                    })
                    .filter(|text| !text.is_empty())
                    .ok_or_else(missing)?;
                Symbol::Literal {
                    text: text.to_string(),
                    case_sensitive: info.case_sensitive,
                }
            }
        },
    };

    Ok(Element {
        token: term.token,
        slot,
        repetition,
        symbol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_path::RulePathBuilder;

    fn symbols(terminals: &[u32], nonterminals: &[u32]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for &id in terminals {
            table.define_terminal(id, false);
        }
        for &id in nonterminals {
            table.define_nonterminal(id);
        }
        table
    }

    #[test]
    fn test_lowering_alternatives() {
        let path = RulePathBuilder::new()
            .rule(1, "start")
            .and((10, "a"))
            .optional((11, "b"))
            .or((12, "c"))
            .repeat(2)
            .end()
            .rule(2, "tail")
            .and((13, "d"))
            .end_and_execute()
            .build();
        let grammar = Grammar::new(path, symbols(&[10, 11, 12, 13], &[1, 2])).unwrap();

        let start = grammar.start();
        assert_eq!(start.alternatives.len(), 2);
        assert_eq!(start.alternatives[0].elements.len(), 2);
        assert_eq!(start.alternatives[0].elements[1].repetition, Repetition::Optional);
        assert_eq!(start.alternatives[1].elements[1].symbol, Symbol::NonTerminal(1));
        assert!(!start.execute);
        assert!(grammar.productions()[1].execute);
    }

    #[test]
    fn test_not_test_lowering() {
        let path = RulePathBuilder::new()
            .rule(1, "word")
            .and((10, "w"))
            .not_test((11, "="))
            .end()
            .build();
        let grammar = Grammar::new(path, symbols(&[10, 11], &[1])).unwrap();
        let elements = &grammar.start().alternatives[0].elements;
        assert_eq!(elements[1].repetition, Repetition::NotTest);
        assert_eq!(grammar.token_name(TokenId::User(11)), "#11");
    }

    #[test]
    fn test_leading_or_gives_empty_alternative() {
        let path = RulePathBuilder::new().rule(1, "maybe").or((10, "x")).end().build();
        let grammar = Grammar::new(path, symbols(&[10], &[1])).unwrap();
        let alternatives = &grammar.start().alternatives;
        assert_eq!(alternatives.len(), 2);
        assert!(alternatives[0].elements.is_empty());
    }

    #[test]
    fn test_default_text_fallback() {
        let path = RulePathBuilder::new()
            .rule(1, "pair")
            .and((10, "key"))
            .and(10)
            .end()
            .build();
        let grammar = Grammar::new(path, symbols(&[10], &[1])).unwrap();
        let second = &grammar.start().alternatives[0].elements[1];
        assert_eq!(
            second.symbol,
            Symbol::Literal {
                text: "key".to_string(),
                case_sensitive: true
            }
        );
        assert_eq!(grammar.token_name(TokenId::User(10)), "key");
        assert_eq!(grammar.token_name(TokenId::User(1)), "pair");
        assert_eq!(grammar.token_name(TokenId::Value), "_value_");
    }

    #[test]
    fn test_structural_errors() {
        let empty = Grammar::new(RulePath::new(), SymbolTable::new());
        assert!(matches!(empty, Err(GrammarError::EmptyGrammar)));

        let unterminated = RulePathBuilder::new().rule(1, "a").and((10, "x")).build();
        assert!(matches!(
            Grammar::new(unterminated, symbols(&[10], &[1])),
            Err(GrammarError::UnterminatedRule { .. })
        ));

        let stray = RulePathBuilder::new().and((10, "x")).rule(1, "a").end().build();
        assert!(matches!(
            Grammar::new(stray, symbols(&[10], &[1])),
            Err(GrammarError::OpOutsideRule { index: 0 })
        ));

        let no_text = RulePathBuilder::new().rule(1, "a").and(10).end().build();
        assert!(matches!(
            Grammar::new(no_text, symbols(&[10], &[1])),
            Err(GrammarError::MissingLiteral { index: 1, .. })
        ));

        let duplicate = RulePathBuilder::new()
            .rule(1, "a")
            .and((10, "x"))
            .end()
            .rule(1, "a")
            .and((10, "y"))
            .end()
            .build();
        assert!(matches!(
            Grammar::new(duplicate, symbols(&[10], &[1])),
            Err(GrammarError::DuplicateRule { index: 3, .. })
        ));
    }
}
