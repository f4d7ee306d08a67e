//! Token ids, context masks and the symbol type table
//!
//! Every token a grammar mentions owns exactly one [`SymbolInfo`]. The table is
//! stored densely and reached through an id-to-slot map built once at grammar
//! load time, so client ids may be sparse without the table being sized to the
//! largest id.

use crate::grammar::GrammarError;
use crate::rule_path::{Operation, RulePath};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a grammar symbol
///
/// Grammar-defined tokens use [`TokenId::User`]. The remaining variants are
/// reserved system tokens understood by the interpreter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenId {
    /// Token defined by the grammar author
    User(u32),
    /// Literal text is matched but no token record is emitted
    NoToken,
    /// Single character out of a character set; runs of these form one label
    Character,
    /// Floating point literal
    Value,
    /// Zero-width marker: the next terminal is matched without skipping whitespace
    NoSpaceSkip,
}

impl TokenId {
    /// All reserved system ids
    pub const SYSTEM: [TokenId; 4] = [
        TokenId::NoToken,
        TokenId::Character,
        TokenId::Value,
        TokenId::NoSpaceSkip,
    ];

    pub fn is_system(self) -> bool {
        !matches!(self, TokenId::User(_))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::User(id) => write!(f, "#{}", id),
            TokenId::NoToken => write!(f, "_no_token_"),
            TokenId::Character => write!(f, "_character_"),
            TokenId::Value => write!(f, "_value_"),
            TokenId::NoSpaceSkip => write!(f, "_no_space_skip_"),
        }
    }
}

/// Bit set of lexical contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContextMask(pub u32);

impl ContextMask {
    /// Wildcard: a token requiring this mask is legal in every context
    pub const ALL: ContextMask = ContextMask(u32::MAX);
    pub const NONE: ContextMask = ContextMask(0);

    /// Returns true if a token requiring `required` may be matched while `self` is active
    pub fn allows(self, required: ContextMask) -> bool {
        required == ContextMask::ALL || self.0 & required.0 != 0
    }

    /// Clear bits first, then set bits
    pub fn apply(self, rule: &ContextRule) -> ContextMask {
        ContextMask((self.0 & !rule.clear.0) | rule.set.0)
    }
}

impl Default for ContextMask {
    fn default() -> Self {
        ContextMask::ALL
    }
}

/// Context requirement of a token and the change it makes once matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRule {
    pub required: ContextMask,
    pub set: ContextMask,
    pub clear: ContextMask,
}

impl ContextRule {
    pub fn new(required: u32, set: u32, clear: u32) -> Self {
        ContextRule {
            required: ContextMask(required),
            set: ContextMask(set),
            clear: ContextMask(clear),
        }
    }

    /// Legal only while one of `required` bits is active; no change on match
    pub fn requires(required: u32) -> Self {
        ContextRule::new(required, 0, 0)
    }
}

impl Default for ContextRule {
    fn default() -> Self {
        ContextRule {
            required: ContextMask::ALL,
            set: ContextMask::NONE,
            clear: ContextMask::NONE,
        }
    }
}

/// Metadata for one token id
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub id: TokenId,
    /// Position of the `Rule` header in the rule path (nonterminals only)
    pub rule_index: Option<usize>,
    /// Position of an op carrying this token's display text
    pub default_text_index: Option<usize>,
    pub context: ContextRule,
    /// Pass 2 dispatches an action when it reaches this token
    pub has_action: bool,
    pub case_sensitive: bool,
    /// Declared as a nonterminal; must be defined by a rule
    pub nonterminal: bool,
}

impl SymbolInfo {
    pub fn new(id: TokenId) -> Self {
        SymbolInfo {
            id,
            rule_index: None,
            default_text_index: None,
            context: ContextRule::default(),
            has_action: false,
            case_sensitive: true,
            nonterminal: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rule_index.is_none() && !self.nonterminal
    }
}

/// Dense symbol storage with an id-to-slot bijection
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
    index: HashMap<TokenId, usize>,
}

impl SymbolTable {
    /// Create a table holding only the system tokens
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            index: HashMap::new(),
        };
        for id in TokenId::SYSTEM {
            table.define(id);
        }
        table
    }

    /// Get the entry for `id`, allocating a fresh one if needed
    pub fn define(&mut self, id: TokenId) -> &mut SymbolInfo {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.symbols.push(SymbolInfo::new(id));
                let slot = self.symbols.len() - 1;
                self.index.insert(id, slot);
                slot
            }
        };
        &mut self.symbols[slot]
    }

    /// Define a terminal, optionally carrying a pass 2 action
    pub fn define_terminal(&mut self, id: u32, has_action: bool) -> &mut SymbolInfo {
        let info = self.define(TokenId::User(id));
        info.has_action = has_action;
        info
    }

    /// Define a nonterminal; it must later receive a `Rule` header
    pub fn define_nonterminal(&mut self, id: u32) -> &mut SymbolInfo {
        let info = self.define(TokenId::User(id));
        info.nonterminal = true;
        info
    }

    /// Replace the context rule of an already defined token
    pub fn set_context(&mut self, id: TokenId, context: ContextRule) -> Result<(), GrammarError> {
        let info = self
            .get_mut(id)
            .ok_or(GrammarError::UnknownToken { token: id, index: None })?;
        info.context = context;
        Ok(())
    }

    pub fn get(&self, id: TokenId) -> Option<&SymbolInfo> {
        self.index.get(&id).map(|&slot| &self.symbols[slot])
    }

    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut SymbolInfo> {
        match self.index.get(&id) {
            Some(&slot) => Some(&mut self.symbols[slot]),
            None => None,
        }
    }

    pub fn slot_of(&self, id: TokenId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Entry by dense slot, as resolved at grammar load time
    pub fn by_slot(&self, slot: usize) -> &SymbolInfo {
        &self.symbols[slot]
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbols.iter()
    }

    /// Smallest user id above every user id in the table
    ///
    /// None once `u32::MAX` is taken.
    pub fn next_free_user_id(&self) -> Option<u32> {
        let highest = self
            .symbols
            .iter()
            .filter_map(|info| match info.id {
                TokenId::User(id) => Some(id),
                _ => None,
            })
            .max();
        highest.map_or(Some(1), |id| id.checked_add(1))
    }

    /// Returns true if pass 2 should dispatch an action for `id`
    pub fn has_action(&self, id: TokenId) -> bool {
        self.get(id).is_some_and(|info| info.has_action)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Link rule path entries to the symbol table
///
/// Every op's token must already own a slot. `Rule` headers record their
/// position as the token's rule index; `And`, `Or` and `Optional` ops with a
/// non-empty literal record their position as the token's default text (the
/// last one in table order wins).
pub fn init_symbol_type_lib(path: &RulePath, table: &mut SymbolTable) -> Result<(), GrammarError> {
    for (index, op) in path.ops().iter().enumerate() {
        let Some(token) = op.token() else {
            continue;
        };
        let info = table.get_mut(token).ok_or(GrammarError::UnknownToken {
            token,
            index: Some(index),
        })?;

        match op.operation() {
            Operation::Rule => {
                if info.rule_index.is_some() {
                    return Err(GrammarError::DuplicateRule {
                        name: op.literal().unwrap_or_default().to_string(),
                        index,
                    });
                }
                info.rule_index = Some(index);
                info.nonterminal = true;
            }
            Operation::And | Operation::Or | Operation::Optional => {
                if op.literal().is_some_and(|text| !text.is_empty()) {
                    info.default_text_index = Some(index);
                }
            }
            _ => {}
        }
    }

    // every declared nonterminal needs a production
    for info in table.iter() {
        if info.nonterminal && info.rule_index.is_none() {
            return Err(GrammarError::UndefinedRule { token: info.id });
        }
    }

    Ok(())
}
