//! Client lexeme registrations for BNF grammars
//!
//! Before a BNF grammar is loaded the client registers the lexemes it wants
//! actions or stable ids for. Terminals are keyed by their literal text and
//! nonterminals by their bracketed name (`<rule>`), so a rule and a keyword may
//! share a spelling. Anything the grammar mentions that is not registered gets
//! a fresh id above every registered one.

use crate::symbols::{ContextRule, SymbolTable, TokenId};
use std::collections::HashMap;

/// Registration of one lexeme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexemeDef {
    pub token: TokenId,
    pub has_action: bool,
    pub case_sensitive: bool,
    pub context: ContextRule,
    pub nonterminal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LexemeTable {
    lexemes: HashMap<String, LexemeDef>,
}

impl LexemeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terminal by its literal text
    pub fn add(&mut self, lexeme: &str, id: u32, has_action: bool) -> &mut Self {
        self.insert(lexeme.to_string(), id, has_action, false)
    }

    /// Register a terminal matched without regard to ASCII case
    pub fn add_case_insensitive(&mut self, lexeme: &str, id: u32, has_action: bool) -> &mut Self {
        self.insert(lexeme.to_string(), id, has_action, false);
        if let Some(def) = self.lexemes.get_mut(lexeme) {
            def.case_sensitive = false;
        }
        self
    }

    /// Register a nonterminal by rule name (without brackets)
    pub fn add_rule(&mut self, name: &str, id: u32) -> &mut Self {
        self.insert(rule_key(name), id, false, true)
    }

    /// Attach a context rule to a registered terminal
    pub fn set_context(&mut self, lexeme: &str, context: ContextRule) -> &mut Self {
        if let Some(def) = self.lexemes.get_mut(lexeme) {
            def.context = context;
        } else {
            log::warn!("context set on unregistered lexeme '{}'", lexeme);
        }
        self
    }

    fn insert(&mut self, key: String, id: u32, has_action: bool, nonterminal: bool) -> &mut Self {
        self.lexemes.insert(
            key,
            LexemeDef {
                token: TokenId::User(id),
                has_action,
                case_sensitive: true,
                context: ContextRule::default(),
                nonterminal,
            },
        );
        self
    }

    /// Registration for a literal, honoring case-insensitive entries
    pub fn terminal(&self, lexeme: &str) -> Option<&LexemeDef> {
        if let Some(def) = self.lexemes.get(lexeme).filter(|def| !def.nonterminal) {
            return Some(def);
        }
        self.lexemes
            .iter()
            .find(|(key, def)| !def.case_sensitive && key.eq_ignore_ascii_case(lexeme))
            .map(|(_, def)| def)
    }

    pub fn rule(&self, name: &str) -> Option<&LexemeDef> {
        self.lexemes.get(&rule_key(name))
    }

    pub fn len(&self) -> usize {
        self.lexemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty()
    }

    /// Symbol table holding the system tokens and every registered terminal
    ///
    /// Registered nonterminals are added once the grammar defines or uses them.
    pub fn to_symbol_table(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        for def in self.lexemes.values().filter(|def| !def.nonterminal) {
            let info = table.define(def.token);
            info.has_action = def.has_action;
            info.case_sensitive = def.case_sensitive;
            info.context = def.context;
        }
        table
    }

    /// Smallest id above every registered id, None once `u32::MAX` is taken
    pub fn next_free_id(&self) -> Option<u32> {
        let highest = self
            .lexemes
            .values()
            .filter_map(|def| match def.token {
                TokenId::User(id) => Some(id),
                _ => None,
            })
            .max();
        highest.map_or(Some(1), |id| id.checked_add(1))
    }
}

fn rule_key(name: &str) -> String {
    format!("<{}>", name)
}
