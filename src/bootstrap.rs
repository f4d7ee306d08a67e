//! Built-in grammar for BNF grammar text
//!
//! The BNF notation is itself described by a hand-built rule path, so BNF
//! grammars are compiled by the same interpreter that later compiles client
//! sources:
//!
//! ```text
//! <syntax>              ::= <rule> {<rule>}
//! <rule>                ::= <identifier> '::=' <expression> ';' ['!']
//! <expression>          ::= <and_term> {<or_term>}
//! <or_term>             ::= '|' <and_term>
//! <and_term>            ::= <term> {<term>}
//! <term>                ::= <not_test> | <term_id> | <repeat_expression> | <optional_expression>
//! <term_id>             ::= <constant> | <identifier> | <terminal_symbol> | <set> | '@'
//! <repeat_expression>   ::= '{' <term_id> '}'
//! <optional_expression> ::= '[' <term_id> ']'
//! <not_test>            ::= '(?!' <term_id> ')'
//! <constant>            ::= '<#' {(name characters)} '>'
//! <identifier>          ::= '<' (letter) {(name characters)} '>'
//! <terminal_symbol>     ::= ['-'] <quoted>
//! <quoted>              ::= <single_quoted> | <double_quoted>
//! <set>                 ::= '(' {(any character but ')')} ')'
//! ```
//!
//! `@` matches the next term without skipping whitespace. Only `//` starts a
//! comment in grammar text; `;` ends a rule.

use crate::charclass::RangeSet;
use crate::grammar::{Grammar, GrammarError};
use crate::input_stream::ScannerConfig;
use crate::rule_path::{RulePath, RulePathBuilder};
use crate::symbols::{SymbolTable, TokenId};

/// Token ids of the BNF grammar
pub mod ids {
    use crate::symbols::TokenId;

    pub const SYNTAX: u32 = 1;
    pub const RULE: u32 = 2;
    pub const EXPRESSION: u32 = 3;
    pub const OR_TERM: u32 = 4;
    pub const AND_TERM: u32 = 5;
    pub const TERM: u32 = 6;
    pub const TERM_ID: u32 = 7;
    pub const REPEAT_EXPRESSION: u32 = 8;
    pub const OPTIONAL_EXPRESSION: u32 = 9;
    pub const IDENTIFIER: u32 = 10;
    pub const CONSTANT: u32 = 11;
    pub const TERMINAL_SYMBOL: u32 = 12;
    pub const QUOTED: u32 = 13;
    pub const SINGLE_QUOTED: u32 = 14;
    pub const DOUBLE_QUOTED: u32 = 15;
    pub const SET: u32 = 16;
    pub const NOT_TEST: u32 = 17;

    pub const ID_BEGIN: TokenId = TokenId::User(20);
    pub const ID_END: TokenId = TokenId::User(21);
    pub const CONSTANT_BEGIN: TokenId = TokenId::User(22);
    pub const SET_RULE: TokenId = TokenId::User(23);
    pub const OR: TokenId = TokenId::User(24);
    pub const REPEAT_BEGIN: TokenId = TokenId::User(25);
    pub const REPEAT_END: TokenId = TokenId::User(26);
    pub const OPTIONAL_BEGIN: TokenId = TokenId::User(27);
    pub const OPTIONAL_END: TokenId = TokenId::User(28);
    pub const SET_BEGIN: TokenId = TokenId::User(29);
    pub const SET_END: TokenId = TokenId::User(30);
    pub const SINGLE_QUOTE: TokenId = TokenId::User(31);
    pub const DOUBLE_QUOTE: TokenId = TokenId::User(32);
    pub const SUPPRESS: TokenId = TokenId::User(33);
    pub const RULE_END: TokenId = TokenId::User(34);
    pub const EXECUTE: TokenId = TokenId::User(35);
    pub const NOT_TEST_BEGIN: TokenId = TokenId::User(36);
    pub const NO_SPACE_SKIP: TokenId = TokenId::User(37);

    pub const TERMINALS: [(TokenId, &str); 18] = [
        (ID_BEGIN, "<"),
        (ID_END, ">"),
        (CONSTANT_BEGIN, "<#"),
        (SET_RULE, "::="),
        (OR, "|"),
        (REPEAT_BEGIN, "{"),
        (REPEAT_END, "}"),
        (OPTIONAL_BEGIN, "["),
        (OPTIONAL_END, "]"),
        (SET_BEGIN, "("),
        (SET_END, ")"),
        (SINGLE_QUOTE, "'"),
        (DOUBLE_QUOTE, "\""),
        (SUPPRESS, "-"),
        (RULE_END, ";"),
        (EXECUTE, "!"),
        (NOT_TEST_BEGIN, "(?!"),
        (NO_SPACE_SKIP, "@"),
    ];
}

use ids::*;

fn letters() -> RangeSet {
    RangeSet::from_range('a', 'z').union(&RangeSet::from_range('A', 'Z'))
}

fn name_characters() -> RangeSet {
    letters()
        .union(&RangeSet::from_range('0', '9'))
        .union(&RangeSet::from_chars("_-.$"))
}

/// Printable ASCII, space and tab, without `excluded`
fn literal_characters(excluded: char) -> RangeSet {
    let mut set = RangeSet::from_range(' ', '~');
    set.add_char('\t');
    set.minus(&RangeSet::from_chars(&excluded.to_string()))
}

fn text(id: TokenId) -> (TokenId, &'static str) {
    let literal = TERMINALS
        .iter()
        .find(|(token, _)| *token == id)
        .map(|(_, literal)| *literal)
        .unwrap_or_default();
    (id, literal)
}

/// Rule path of the BNF grammar
pub fn bnf_rule_path() -> RulePath {
    let letters = letters().to_literal();
    let name = name_characters().to_literal();
    let single = literal_characters('\'').to_literal();
    let double = literal_characters('"').to_literal();
    let set = literal_characters(')').to_literal();

    RulePathBuilder::new()
        .rule(SYNTAX, "syntax")
        .and(RULE)
        .repeat(RULE)
        .end()
        .rule(RULE, "rule")
        .and(IDENTIFIER)
        .and(text(SET_RULE))
        .and(EXPRESSION)
        .and(text(RULE_END))
        .optional(text(EXECUTE))
        .end()
        .rule(EXPRESSION, "expression")
        .and(AND_TERM)
        .repeat(OR_TERM)
        .end()
        .rule(OR_TERM, "or_term")
        .and(text(OR))
        .and(AND_TERM)
        .end()
        .rule(AND_TERM, "and_term")
        .and(TERM)
        .repeat(TERM)
        .end()
        .rule(TERM, "term")
        .and(NOT_TEST)
        .or(TERM_ID)
        .or(REPEAT_EXPRESSION)
        .or(OPTIONAL_EXPRESSION)
        .end()
        .rule(TERM_ID, "term_id")
        .and(CONSTANT)
        .or(IDENTIFIER)
        .or(TERMINAL_SYMBOL)
        .or(SET)
        .or(text(NO_SPACE_SKIP))
        .end()
        .rule(REPEAT_EXPRESSION, "repeat_expression")
        .and(text(REPEAT_BEGIN))
        .and(TERM_ID)
        .and(text(REPEAT_END))
        .end()
        .rule(OPTIONAL_EXPRESSION, "optional_expression")
        .and(text(OPTIONAL_BEGIN))
        .and(TERM_ID)
        .and(text(OPTIONAL_END))
        .end()
        .rule(NOT_TEST, "not_test")
        .and(text(NOT_TEST_BEGIN))
        .and(TERM_ID)
        .and(text(SET_END))
        .end()
        .rule(CONSTANT, "constant")
        .and(text(CONSTANT_BEGIN))
        .repeat((TokenId::Character, name.as_str()))
        .and(text(ID_END))
        .end()
        .rule(IDENTIFIER, "identifier")
        .and(text(ID_BEGIN))
        .and((TokenId::Character, letters.as_str()))
        .repeat((TokenId::Character, name.as_str()))
        .and(text(ID_END))
        .end()
        .rule(TERMINAL_SYMBOL, "terminal_symbol")
        .optional(text(SUPPRESS))
        .and(QUOTED)
        .end()
        .rule(QUOTED, "quoted")
        .and(SINGLE_QUOTED)
        .or(DOUBLE_QUOTED)
        .end()
        .rule(SINGLE_QUOTED, "single_quoted")
        .and(text(SINGLE_QUOTE))
        .and(TokenId::NoSpaceSkip)
        .repeat((TokenId::Character, single.as_str()))
        .and(text(SINGLE_QUOTE))
        .end()
        .rule(DOUBLE_QUOTED, "double_quoted")
        .and(text(DOUBLE_QUOTE))
        .and(TokenId::NoSpaceSkip)
        .repeat((TokenId::Character, double.as_str()))
        .and(text(DOUBLE_QUOTE))
        .end()
        .rule(SET, "set")
        .and(text(SET_BEGIN))
        .and(TokenId::NoSpaceSkip)
        .repeat((TokenId::Character, set.as_str()))
        .and(text(SET_END))
        .end()
        .build()
}

/// Symbol table of the BNF grammar
pub fn bnf_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    for id in SYNTAX..=NOT_TEST {
        symbols.define_nonterminal(id);
    }
    for (token, _) in TERMINALS {
        symbols.define(token);
    }
    symbols
}

/// Grammar that compiles BNF grammar text
pub fn bnf_grammar() -> Result<Grammar, GrammarError> {
    let grammar = Grammar::new(bnf_rule_path(), bnf_symbols())?;
    Ok(grammar.with_scanner_config(ScannerConfig::new(["//"])))
}
