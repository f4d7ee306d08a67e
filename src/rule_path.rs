//! Flat rule path representation of a grammar
//!
//! A grammar arrives as an ordered table of [`RuleOp`]s: a `Rule` header, the
//! ops of its right hand side and a closing `End` (or `EndAndExecute`). This is
//! the format produced by the BNF builder and accepted from hand-built tables.

use crate::symbols::TokenId;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Operation tag of a rule path entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Rule,
    And,
    Or,
    Optional,
    Repeat,
    NotTest,
    End,
    EndAndExecute,
}

/// Token reference with an optional literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub token: TokenId,
    /// Source text for terminals, set members for `Character`
    pub literal: Option<String>,
}

impl Term {
    pub fn new(token: TokenId, literal: Option<&str>) -> Self {
        Term {
            token,
            literal: literal.map(str::to_string),
        }
    }
}

impl From<TokenId> for Term {
    fn from(token: TokenId) -> Self {
        Term { token, literal: None }
    }
}

impl From<u32> for Term {
    fn from(id: u32) -> Self {
        Term::from(TokenId::User(id))
    }
}

impl From<(TokenId, &str)> for Term {
    fn from((token, literal): (TokenId, &str)) -> Self {
        Term::new(token, Some(literal))
    }
}

impl From<(u32, &str)> for Term {
    fn from((id, literal): (u32, &str)) -> Self {
        Term::new(TokenId::User(id), Some(literal))
    }
}

/// One entry of the rule path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOp {
    /// Start of a production for `token`
    Rule { token: TokenId, name: String },
    /// Required element
    And(Term),
    /// Start of the next alternative; the element itself is required
    Or(Term),
    /// Element may match zero or one time
    Optional(Term),
    /// Element may match zero or more times
    Repeat(Term),
    /// Zero-width negative lookahead: succeeds only if the element does not match
    NotTest(Term),
    End,
    /// End of a production whose success triggers pass 2
    EndAndExecute,
}

impl RuleOp {
    pub fn operation(&self) -> Operation {
        match self {
            RuleOp::Rule { .. } => Operation::Rule,
            RuleOp::And(_) => Operation::And,
            RuleOp::Or(_) => Operation::Or,
            RuleOp::Optional(_) => Operation::Optional,
            RuleOp::Repeat(_) => Operation::Repeat,
            RuleOp::NotTest(_) => Operation::NotTest,
            RuleOp::End => Operation::End,
            RuleOp::EndAndExecute => Operation::EndAndExecute,
        }
    }

    pub fn token(&self) -> Option<TokenId> {
        match self {
            RuleOp::Rule { token, .. } => Some(*token),
            _ => self.term().map(|term| term.token),
        }
    }

    /// Display text: rule name for headers, literal for elements
    pub fn literal(&self) -> Option<&str> {
        match self {
            RuleOp::Rule { name, .. } => Some(name),
            _ => self.term().and_then(|term| term.literal.as_deref()),
        }
    }

    pub fn term(&self) -> Option<&Term> {
        match self {
            RuleOp::And(term)
            | RuleOp::Or(term)
            | RuleOp::Optional(term)
            | RuleOp::Repeat(term)
            | RuleOp::NotTest(term) => Some(term),
            RuleOp::Rule { .. } | RuleOp::End | RuleOp::EndAndExecute => None,
        }
    }
}

/// Ordered rule op table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePath {
    ops: Vec<RuleOp>,
}

impl RulePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: Vec<RuleOp>) -> Self {
        RulePath { ops }
    }

    pub fn push(&mut self, op: RuleOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[RuleOp] {
        &self.ops
    }

    pub fn get(&self, index: usize) -> Option<&RuleOp> {
        self.ops.get(index)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render the table back into BNF notation, one rule per line
    pub fn to_bnf(&self) -> String {
        let names: HashMap<TokenId, &str> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                RuleOp::Rule { token, name } => Some((*token, name.as_str())),
                _ => None,
            })
            .collect();

        let mut out = String::new();
        for op in &self.ops {
            match op {
                RuleOp::Rule { name, .. } => {
                    let _ = write!(out, "<{}> ::=", name);
                }
                RuleOp::And(term) => render_term(&mut out, " ", term, "", &names),
                RuleOp::Or(term) => render_term(&mut out, " | ", term, "", &names),
                RuleOp::Optional(term) => render_term(&mut out, " [", term, "]", &names),
                RuleOp::Repeat(term) => render_term(&mut out, " {", term, "}", &names),
                RuleOp::NotTest(term) => render_term(&mut out, " (?!", term, ")", &names),
                RuleOp::End => out.push_str(" ;\n"),
                RuleOp::EndAndExecute => out.push_str(" ;!\n"),
            }
        }
        out
    }
}

fn render_term(
    out: &mut String,
    open: &str,
    term: &Term,
    close: &str,
    names: &HashMap<TokenId, &str>,
) {
    out.push_str(open);
    let literal = term.literal.as_deref().unwrap_or("");
    match term.token {
        TokenId::Value => out.push_str("<#>"),
        TokenId::Character => {
            let _ = write!(out, "({})", literal);
        }
        TokenId::NoSpaceSkip => out.push('@'),
        TokenId::NoToken => out.push('-'),
        TokenId::User(_) => {}
    }
    match (term.token, names.get(&term.token)) {
        (TokenId::User(_), Some(name)) => {
            let _ = write!(out, "<{}>", name);
        }
        (TokenId::User(_) | TokenId::NoToken, None) => {
            if literal.contains('\'') {
                let _ = write!(out, "\"{}\"", literal);
            } else {
                let _ = write!(out, "'{}'", literal);
            }
        }
        _ => {}
    }
    out.push_str(close);
}

/// Fluent construction of hand-built rule paths
#[derive(Debug, Default)]
pub struct RulePathBuilder {
    path: RulePath,
}

impl RulePathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, id: u32, name: &str) -> Self {
        self.path.push(RuleOp::Rule {
            token: TokenId::User(id),
            name: name.to_string(),
        });
        self
    }

    pub fn and(mut self, term: impl Into<Term>) -> Self {
        self.path.push(RuleOp::And(term.into()));
        self
    }

    pub fn or(mut self, term: impl Into<Term>) -> Self {
        self.path.push(RuleOp::Or(term.into()));
        self
    }

    pub fn optional(mut self, term: impl Into<Term>) -> Self {
        self.path.push(RuleOp::Optional(term.into()));
        self
    }

    pub fn repeat(mut self, term: impl Into<Term>) -> Self {
        self.path.push(RuleOp::Repeat(term.into()));
        self
    }

    pub fn not_test(mut self, term: impl Into<Term>) -> Self {
        self.path.push(RuleOp::NotTest(term.into()));
        self
    }

    pub fn end(mut self) -> Self {
        self.path.push(RuleOp::End);
        self
    }

    pub fn end_and_execute(mut self) -> Self {
        self.path.push(RuleOp::EndAndExecute);
        self
    }

    pub fn build(self) -> RulePath {
        self.path
    }
}
