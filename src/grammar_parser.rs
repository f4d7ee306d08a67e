//! Builds rule paths from BNF grammar text
//!
//! The text is compiled with the built-in BNF grammar, then its token stream is
//! walked with a [`TokenCursor`] the same way a client's pass 2 would walk its
//! own tokens. Each rule becomes a `Rule` header, the ops of its right hand
//! side and an `End` (or `EndAndExecute` for rules closed with `;!`).

use crate::bootstrap::{bnf_grammar, ids::*};
use crate::compiler::Compiler;
use crate::grammar::{Grammar, GrammarError};
use crate::lexemes::LexemeTable;
use crate::pass2::TokenCursor;
use crate::rule_path::{Operation, RuleOp, RulePath, Term};
use crate::symbols::{SymbolTable, TokenId};
use std::collections::{HashMap, HashSet};

/// Compile BNF grammar text into a ready grammar
pub fn parse_bnf_grammar(text: &str, lexemes: &LexemeTable) -> Result<Grammar, GrammarError> {
    let (path, symbols) = build_rule_path(text, lexemes)?;
    Grammar::new(path, symbols)
}

/// Compile BNF grammar text into a rule path and its symbol table
pub fn build_rule_path(
    text: &str,
    lexemes: &LexemeTable,
) -> Result<(RulePath, SymbolTable), GrammarError> {
    let compiler = Compiler::new(bnf_grammar()?);
    let stream = compiler.tokenize(text).map_err(GrammarError::Bnf)?;
    log::debug!("BNF grammar text produced {} tokens", stream.len());

    let mut cursor = TokenCursor::new(&stream, compiler.grammar().symbols());
    RuleBuilder::new(lexemes).build(&mut cursor)
}

struct RuleBuilder<'l> {
    lexemes: &'l LexemeTable,
    symbols: SymbolTable,
    path: RulePath,
    /// Ids handed out to lexemes the client did not register
    assigned: HashMap<String, TokenId>,
    /// None once every id is taken
    next_id: Option<u32>,
    defined: HashSet<TokenId>,
    pending: Operation,
    suppress: bool,
}

impl<'l> RuleBuilder<'l> {
    fn new(lexemes: &'l LexemeTable) -> Self {
        RuleBuilder {
            lexemes,
            symbols: lexemes.to_symbol_table(),
            path: RulePath::new(),
            assigned: HashMap::new(),
            next_id: lexemes.next_free_id(),
            defined: HashSet::new(),
            pending: Operation::And,
            suppress: false,
        }
    }

    fn build(
        mut self,
        cursor: &mut TokenCursor<'_>,
    ) -> Result<(RulePath, SymbolTable), GrammarError> {
        while cursor.has_next() {
            let record = *cursor.next_token()?;
            match record.token {
                ID_BEGIN => {
                    let name = cursor.next_token_label()?.to_string();
                    cursor.next_token_expecting(ID_END)?;
                    if cursor.test_next_token_id(SET_RULE) {
                        cursor.next_token()?;
                        self.begin_rule(&name)?;
                    } else {
                        let token = self.rule_token(&name)?;
                        self.push_term(Term::from(token));
                    }
                }
                CONSTANT_BEGIN => {
                    // the constant's name only documents the grammar
                    if cursor.test_next_token_id(TokenId::Character) {
                        cursor.next_token()?;
                    }
                    cursor.next_token_expecting(ID_END)?;
                    self.push_term(Term::from(TokenId::Value));
                }
                SINGLE_QUOTE | DOUBLE_QUOTE => {
                    if !cursor.test_next_token_id(TokenId::Character) {
                        return Err(GrammarError::EmptyLiteral { line: record.line });
                    }
                    let literal = cursor.next_token_label()?.to_string();
                    cursor.next_token_expecting(record.token)?;
                    let token = if self.suppress {
                        TokenId::NoToken
                    } else {
                        self.terminal_token(&literal)?
                    };
                    self.push_term(Term::new(token, Some(&literal)));
                }
                SET_BEGIN => {
                    if !cursor.test_next_token_id(TokenId::Character) {
                        return Err(GrammarError::EmptyLiteral { line: record.line });
                    }
                    let members = cursor.next_token_label()?.to_string();
                    cursor.next_token_expecting(SET_END)?;
                    self.push_term(Term::new(TokenId::Character, Some(&members)));
                }
                NO_SPACE_SKIP => self.push_term(Term::from(TokenId::NoSpaceSkip)),
                OR => self.pending = Operation::Or,
                REPEAT_BEGIN | OPTIONAL_BEGIN | NOT_TEST_BEGIN => {
                    if self.pending == Operation::Or {
                        return Err(GrammarError::ModifierAfterOr { line: record.line });
                    }
                    self.pending = match record.token {
                        REPEAT_BEGIN => Operation::Repeat,
                        OPTIONAL_BEGIN => Operation::Optional,
                        _ => Operation::NotTest,
                    };
                }
                SUPPRESS => self.suppress = true,
                RULE_END => {
                    if cursor.test_next_token_id(EXECUTE) {
                        cursor.next_token()?;
                        self.path.push(RuleOp::EndAndExecute);
                    } else {
                        self.path.push(RuleOp::End);
                    }
                    self.pending = Operation::And;
                }
                // closing brackets carry no information
                _ => {}
            }
        }
        Ok((self.path, self.symbols))
    }

    fn begin_rule(&mut self, name: &str) -> Result<(), GrammarError> {
        let token = self.rule_token(name)?;
        if !self.defined.insert(token) {
            return Err(GrammarError::DuplicateRule {
                name: name.to_string(),
                index: self.path.len(),
            });
        }
        self.path.push(RuleOp::Rule {
            token,
            name: name.to_string(),
        });
        Ok(())
    }

    fn push_term(&mut self, term: Term) {
        let op = match self.pending {
            Operation::Or => RuleOp::Or(term),
            Operation::Optional => RuleOp::Optional(term),
            Operation::Repeat => RuleOp::Repeat(term),
            Operation::NotTest => RuleOp::NotTest(term),
            _ => RuleOp::And(term),
        };
        self.path.push(op);
        self.pending = Operation::And;
        self.suppress = false;
    }

    fn rule_token(&mut self, name: &str) -> Result<TokenId, GrammarError> {
        let token = match self.lexemes.rule(name) {
            Some(def) => def.token,
            None => self.fresh_token(format!("<{}>", name))?,
        };
        self.symbols.define(token).nonterminal = true;
        Ok(token)
    }

    fn terminal_token(&mut self, literal: &str) -> Result<TokenId, GrammarError> {
        match self.lexemes.terminal(literal) {
            Some(def) => Ok(def.token),
            None => {
                let token = self.fresh_token(literal.to_string())?;
                self.symbols.define(token);
                Ok(token)
            }
        }
    }

    fn fresh_token(&mut self, key: String) -> Result<TokenId, GrammarError> {
        if let Some(&token) = self.assigned.get(&key) {
            return Ok(token);
        }
        let Some(id) = self.next_id else {
            return Err(GrammarError::IdSpaceExhausted { lexeme: key });
        };
        let token = TokenId::User(id);
        self.next_id = id.checked_add(1);
        log::trace!("assigned {} to unregistered lexeme {}", token, key);
        self.assigned.insert(key, token);
        Ok(token)
    }
}
