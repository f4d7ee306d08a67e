//! Pass 2: semantic action dispatch over the token stream
//!
//! Pass 2 walks the records produced by pass 1 and calls the client's action
//! for every token flagged with an action. The action receives a
//! [`TokenCursor`] positioned on its own token and may consume the operand
//! tokens that follow it; the walk resumes after the last token it consumed.

use crate::symbols::{SymbolTable, TokenId};
use crate::token_stream::{TokenRecord, TokenStream};
use std::collections::HashMap;
use thiserror::Error;

/// Misuse of the token cursor by an action
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Pass2Error {
    #[error("no more tokens after index {position}")]
    OutOfTokens { position: usize },

    #[error("expected token {expected} at line {line} but found {found}")]
    UnexpectedToken { expected: TokenId, found: TokenId, line: usize },

    #[error("token {found} at line {line} carries no numeric value")]
    NotAValue { found: TokenId, line: usize },

    #[error("token {found} at line {line} carries no label")]
    NotALabel { found: TokenId, line: usize },
}

/// Failure reported from pass 2
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no action registered for token {0}")]
    Unregistered(TokenId),

    #[error(transparent)]
    Token(#[from] Pass2Error),

    #[error("{message} (line {line})")]
    Failed { message: String, line: usize },
}

/// Read access to the token stream for pass 2 actions
///
/// `next` is the index of the record the next read returns; the current token
/// is the one just before it.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    stream: &'t TokenStream,
    symbols: &'t SymbolTable,
    next: usize,
}

impl<'t> TokenCursor<'t> {
    /// Cursor positioned before the first record
    pub fn new(stream: &'t TokenStream, symbols: &'t SymbolTable) -> Self {
        TokenCursor {
            stream,
            symbols,
            next: 0,
        }
    }

    /// Cursor whose current token is `index`
    pub fn at(stream: &'t TokenStream, symbols: &'t SymbolTable, index: usize) -> Self {
        TokenCursor {
            stream,
            symbols,
            next: index + 1,
        }
    }

    /// Index of the record the next read returns
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn stream(&self) -> &'t TokenStream {
        self.stream
    }

    pub fn has_next(&self) -> bool {
        self.next < self.stream.len()
    }

    /// The token last handed out
    pub fn current(&self) -> Result<&'t TokenRecord, Pass2Error> {
        self.next
            .checked_sub(1)
            .and_then(|index| self.stream.get(index))
            .ok_or(Pass2Error::OutOfTokens { position: self.next })
    }

    /// Advance and return the next token
    pub fn next_token(&mut self) -> Result<&'t TokenRecord, Pass2Error> {
        let record = self
            .stream
            .get(self.next)
            .ok_or(Pass2Error::OutOfTokens { position: self.next })?;
        self.next += 1;
        Ok(record)
    }

    /// Advance, requiring the next token to be `expected`
    pub fn next_token_expecting(
        &mut self,
        expected: TokenId,
    ) -> Result<&'t TokenRecord, Pass2Error> {
        let record = self.next_token()?;
        if record.token != expected {
            return Err(Pass2Error::UnexpectedToken {
                expected,
                found: record.token,
                line: record.line,
            });
        }
        Ok(record)
    }

    /// Step back one token so the last read is returned again
    pub fn push_back(&mut self) {
        self.next = self.next.saturating_sub(1);
    }

    /// Advance and return the numeric value of the next token
    pub fn next_token_value(&mut self) -> Result<f64, Pass2Error> {
        let index = self.next;
        let record = self.next_token()?;
        match (record.token, self.stream.constant(index)) {
            (TokenId::Value, Some(value)) => Ok(value),
            _ => Err(Pass2Error::NotAValue {
                found: record.token,
                line: record.line,
            }),
        }
    }

    /// Advance and return the label of the next token
    pub fn next_token_label(&mut self) -> Result<&'t str, Pass2Error> {
        let index = self.next;
        let record = self.next_token()?;
        match (record.token, self.stream.label(index)) {
            (TokenId::Character, Some(label)) => Ok(label),
            _ => Err(Pass2Error::NotALabel {
                found: record.token,
                line: record.line,
            }),
        }
    }

    /// Returns true if the next token is `id`, without advancing
    pub fn test_next_token_id(&self, id: TokenId) -> bool {
        self.stream.get(self.next).is_some_and(|record| record.token == id)
    }

    /// Number of operand tokens before the next token that has an action
    pub fn remaining_tokens_for_action(&self) -> usize {
        self.stream.records()[self.next.min(self.stream.len())..]
            .iter()
            .take_while(|record| !self.symbols.has_action(record.token))
            .count()
    }

    /// Line and byte offset of the current token
    pub fn source_position(&self) -> Option<(usize, usize)> {
        self.current().ok().map(|record| (record.line, record.offset))
    }
}

/// Client hook for pass 2
pub trait Pass2Actions {
    /// Run the action for `token`; the cursor's current token is `token`
    fn execute(&mut self, token: TokenId, cursor: &mut TokenCursor<'_>) -> Result<(), ActionError>;
}

/// Pass 2 without semantic actions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActions;

impl Pass2Actions for NoActions {
    fn execute(
        &mut self,
        _token: TokenId,
        _cursor: &mut TokenCursor<'_>,
    ) -> Result<(), ActionError> {
        Ok(())
    }
}

type Action<'a> = Box<dyn FnMut(&mut TokenCursor<'_>) -> Result<(), ActionError> + 'a>;

/// Action table keyed by token id
#[derive(Default)]
pub struct ActionMap<'a> {
    actions: HashMap<TokenId, Action<'a>>,
}

impl<'a> ActionMap<'a> {
    pub fn new() -> Self {
        ActionMap {
            actions: HashMap::new(),
        }
    }

    pub fn insert<F>(&mut self, id: TokenId, action: F) -> &mut Self
    where
        F: FnMut(&mut TokenCursor<'_>) -> Result<(), ActionError> + 'a,
    {
        self.actions.insert(id, Box::new(action));
        self
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.actions.contains_key(&id)
    }
}

impl Pass2Actions for ActionMap<'_> {
    fn execute(&mut self, token: TokenId, cursor: &mut TokenCursor<'_>) -> Result<(), ActionError> {
        let action = self.actions.get_mut(&token).ok_or(ActionError::Unregistered(token))?;
        action(cursor)
    }
}

/// Dispatch actions for every actionable record from `start` onwards
///
/// Returns the position where the next pass 2 run continues.
pub fn run_pass2<A: Pass2Actions + ?Sized>(
    stream: &TokenStream,
    symbols: &SymbolTable,
    start: usize,
    actions: &mut A,
) -> Result<usize, ActionError> {
    let mut position = start;
    while position < stream.len() {
        let record = &stream.records()[position];
        if !symbols.has_action(record.token) {
            position += 1;
            continue;
        }
        log::trace!("pass 2 action {} at line {}", record.token, record.line);
        let mut cursor = TokenCursor::at(stream, symbols, position);
        actions.execute(record.token, &mut cursor)?;
        // an action may push back past its own token; always make progress
        position = cursor.position().max(position + 1);
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const SET: TokenId = TokenId::User(1);
    const NAME: TokenId = TokenId::User(2);

    fn fixture() -> (TokenStream, SymbolTable) {
        let mut symbols = SymbolTable::new();
        symbols.define_terminal(1, true);
        symbols.define_terminal(2, false);

        // set width 4.5 ; set name
        let mut stream = TokenStream::new();
        let push = |stream: &mut TokenStream, token, offset| {
            stream.push(TokenRecord {
                token,
                rule: TokenId::User(0),
                line: 1,
                offset,
            })
        };
        push(&mut stream, SET, 0);
        stream.begin_label();
        stream.push_label_char('w');
        push(&mut stream, TokenId::Character, 4);
        stream.end_label();
        stream.insert_constant(2, 4.5);
        push(&mut stream, TokenId::Value, 10);
        push(&mut stream, SET, 14);
        push(&mut stream, NAME, 18);
        (stream, symbols)
    }

    #[test]
    fn test_cursor_reads() {
        let (stream, symbols) = fixture();
        let mut cursor = TokenCursor::at(&stream, &symbols, 0);
        assert_eq!(cursor.current().unwrap().token, SET);
        assert_eq!(cursor.remaining_tokens_for_action(), 2);
        assert!(cursor.test_next_token_id(TokenId::Character));
        assert_eq!(cursor.next_token_label().unwrap(), "w");
        assert_eq!(cursor.next_token_value().unwrap(), 4.5);
        assert_eq!(cursor.remaining_tokens_for_action(), 0);

        cursor.push_back();
        assert_eq!(cursor.next_token_value().unwrap(), 4.5);
        assert_eq!(cursor.source_position(), Some((1, 10)));
    }

    #[test]
    fn test_cursor_errors() {
        let (stream, symbols) = fixture();
        let mut cursor = TokenCursor::at(&stream, &symbols, 3);
        assert_eq!(
            cursor.next_token_value(),
            Err(Pass2Error::NotAValue { found: NAME, line: 1 })
        );
        assert_eq!(
            cursor.next_token(),
            Err(Pass2Error::OutOfTokens { position: 5 })
        );

        let mut cursor = TokenCursor::at(&stream, &symbols, 0);
        assert!(matches!(
            cursor.next_token_expecting(NAME),
            Err(Pass2Error::UnexpectedToken { expected: NAME, found: TokenId::Character, .. })
        ));
        assert!(TokenCursor::new(&stream, &symbols).current().is_err());
    }

    #[test]
    fn test_run_pass2_consumes_operands() {
        let (stream, symbols) = fixture();
        let seen = RefCell::new(Vec::new());
        let mut actions = ActionMap::new();
        actions.insert(SET, |cursor: &mut TokenCursor<'_>| {
            let operands = cursor.remaining_tokens_for_action();
            for _ in 0..operands {
                cursor.next_token()?;
            }
            seen.borrow_mut().push((cursor.position(), operands));
            Ok(())
        });

        let end = run_pass2(&stream, &symbols, 0, &mut actions).unwrap();
        assert_eq!(end, 5);
        drop(actions);
        assert_eq!(seen.into_inner(), vec![(3, 2), (5, 1)]);
    }

    #[test]
    fn test_unregistered_action() {
        let (stream, symbols) = fixture();
        let mut actions = ActionMap::new();
        let err = run_pass2(&stream, &symbols, 0, &mut actions).unwrap_err();
        assert!(matches!(err, ActionError::Unregistered(SET)));
    }

    #[test]
    fn test_resumes_from_start() {
        let (stream, symbols) = fixture();
        let mut count = 0;
        let mut counter = |_: &mut TokenCursor<'_>| -> Result<(), ActionError> {
            count += 1;
            Ok(())
        };
        let mut actions = ActionMap::new();
        actions.insert(SET, &mut counter);
        run_pass2(&stream, &symbols, 1, &mut actions).unwrap();
        drop(actions);
        assert_eq!(count, 1);
    }
}
