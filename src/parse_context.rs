//! Pass 1 state, compile options and compile errors
//!
//! Tracks the active context mask, recursion depth, step budget and the
//! furthest failure seen so far, which becomes the reported syntax error.

use crate::input_stream::line_col;
use crate::pass2::ActionError;
use crate::symbols::ContextMask;
use crate::token_stream::LabelMark;
use std::fmt;
use thiserror::Error;

/// Default ceiling for nested rule invocations
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// When pass 2 runs relative to pass 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutePolicy {
    /// Run pass 2 each time an `EndAndExecute` production succeeds
    #[default]
    Interleaved,
    /// Buffer every action until pass 1 has accepted the whole source
    Deferred,
}

/// Options for a single compile call
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub max_depth: usize,
    /// Upper bound on element attempts (None = unlimited)
    pub step_budget: Option<u64>,
    pub execute_policy: ExecutePolicy,
    pub initial_context: ContextMask,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            step_budget: None,
            execute_policy: ExecutePolicy::default(),
            initial_context: ContextMask::ALL,
        }
    }
}

/// Everything restored when an alternative or a rule fails
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub tokens: usize,
    pub position: usize,
    pub line: usize,
    pub context: ContextMask,
    pub no_space_skip: bool,
    pub label: LabelMark,
}

/// Context maintained during pass 1
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub active_context: ContextMask,
    /// Next terminal is matched without skipping whitespace
    pub no_space_skip: bool,
    /// Current nesting of rule invocations
    pub depth: usize,
    max_depth: usize,
    steps: u64,
    step_budget: Option<u64>,
    furthest: Option<Failure>,
    /// Nesting of negative lookaheads in progress
    lookahead: usize,
}

#[derive(Debug, Clone)]
struct Failure {
    offset: usize,
    expected: Vec<String>,
}

impl ParseContext {
    pub fn new(options: &CompileOptions) -> Self {
        ParseContext {
            active_context: options.initial_context,
            no_space_skip: false,
            depth: 0,
            max_depth: options.max_depth,
            steps: 0,
            step_budget: options.step_budget,
            furthest: None,
            lookahead: 0,
        }
    }

    /// Enter a rule, failing once the depth ceiling is crossed
    pub fn enter_rule(&mut self, rule: &str, offset: usize) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(CompileError::DepthLimit {
                rule: rule.to_string(),
                depth: self.max_depth,
                offset,
            });
        }
        Ok(())
    }

    pub fn exit_rule(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Count one unit of work against the step budget
    pub fn check_step_limit(&mut self) -> Result<(), CompileError> {
        self.steps += 1;
        match self.step_budget {
            Some(budget) if self.steps > budget => Err(CompileError::StepBudgetExceeded {
                consumed: self.steps,
                budget,
            }),
            _ => Ok(()),
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn enter_lookahead(&mut self) {
        self.lookahead += 1;
    }

    pub fn exit_lookahead(&mut self) {
        self.lookahead = self.lookahead.saturating_sub(1);
    }

    /// Inside a negative lookahead nothing is executed or reported
    pub fn in_lookahead(&self) -> bool {
        self.lookahead > 0
    }

    /// Remember what was expected at `offset` if it is the furthest failure yet
    pub fn record_failure(&mut self, offset: usize, expected: impl FnOnce() -> String) {
        if self.in_lookahead() {
            return;
        }
        if let Some(failure) = &mut self.furthest {
            if failure.offset > offset {
                return;
            }
            if failure.offset == offset {
                let text = expected();
                if !failure.expected.contains(&text) {
                    failure.expected.push(text);
                }
                return;
            }
        }
        self.furthest = Some(Failure {
            offset,
            expected: vec![expected()],
        });
    }

    /// Build the syntax error reported for a rejected source
    ///
    /// `stopped_at` is where pass 1 stopped; for trailing input it is the
    /// first unconsumed symbol.
    pub fn syntax_error(&self, source: &str, stopped_at: usize, trailing: bool) -> SyntaxError {
        let (offset, expected) = match &self.furthest {
            Some(failure) if failure.offset >= stopped_at => {
                (failure.offset, failure.expected.clone())
            }
            _ if trailing => (stopped_at, vec!["end of input".to_string()]),
            _ => (stopped_at, Vec::new()),
        };
        let (line, column) = line_col(source, offset);
        let found = match source.get(offset..).and_then(|rest| rest.split_whitespace().next()) {
            Some(word) => word.chars().take(16).collect(),
            None => String::new(),
        };
        SyntaxError {
            line,
            column,
            offset,
            expected,
            found,
            trailing,
        }
    }
}

/// Source rejected by pass 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    /// Byte offset of the furthest failure
    pub offset: usize,
    /// Literals and symbol kinds that would have been accepted there
    pub expected: Vec<String>,
    /// Text found at the failure point (empty at end of input)
    pub found: String,
    /// The grammar was satisfied but unconsumed input remained
    pub trailing: bool,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at line {}, column {}: ", self.line, self.column)?;
        if self.trailing && self.expected.iter().all(|e| e == "end of input") {
            return write!(f, "unexpected trailing input '{}'", self.found);
        }
        if self.expected.is_empty() {
            write!(f, "no rule matched")?;
        } else {
            write!(f, "expected {}", self.expected.join(" or "))?;
        }
        if self.found.is_empty() {
            write!(f, " but found end of input")
        } else {
            write!(f, " but found '{}'", self.found)
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Error type for compile failures
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("rule nesting deeper than {depth} in <{rule}> at offset {offset}")]
    DepthLimit { rule: String, depth: usize, offset: usize },

    #[error("step budget exceeded: {consumed} / {budget} steps")]
    StepBudgetExceeded { consumed: u64, budget: u64 },

    #[error("pass 2 action failed: {0}")]
    Action(#[from] ActionError),
}

impl CompileError {
    /// Line of the failure, where one is known
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Syntax(err) => Some(err.line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_limit() {
        let mut ctx = ParseContext::new(&CompileOptions {
            max_depth: 2,
            ..Default::default()
        });
        assert!(ctx.enter_rule("a", 0).is_ok());
        assert!(ctx.enter_rule("a", 0).is_ok());
        let err = ctx.enter_rule("a", 0).unwrap_err();
        assert!(matches!(err, CompileError::DepthLimit { depth: 2, .. }));

        ctx.exit_rule();
        ctx.exit_rule();
        ctx.exit_rule();
        ctx.exit_rule();
        assert_eq!(ctx.depth, 0);
    }

    #[test]
    fn test_step_budget() {
        let mut ctx = ParseContext::new(&CompileOptions {
            step_budget: Some(3),
            ..Default::default()
        });
        for _ in 0..3 {
            ctx.check_step_limit().unwrap();
        }
        let err = ctx.check_step_limit().unwrap_err();
        assert!(matches!(
            err,
            CompileError::StepBudgetExceeded { consumed: 4, budget: 3 }
        ));
    }

    #[test]
    fn test_unlimited_steps() {
        let mut ctx = ParseContext::new(&CompileOptions::default());
        for _ in 0..10_000 {
            ctx.check_step_limit().unwrap();
        }
        assert_eq!(ctx.steps(), 10_000);
    }

    #[test]
    fn test_furthest_failure_wins() {
        let mut ctx = ParseContext::new(&CompileOptions::default());
        ctx.record_failure(2, || "'a'".to_string());
        ctx.record_failure(6, || "'b'".to_string());
        ctx.record_failure(6, || "'c'".to_string());
        ctx.record_failure(6, || "'b'".to_string());
        ctx.record_failure(4, || "'d'".to_string());

        let err = ctx.syntax_error("begin\n x y", 0, false);
        assert_eq!(err.offset, 6);
        assert_eq!(err.expected, vec!["'b'", "'c'"]);
        assert_eq!((err.line, err.column), (2, 1));
        assert_eq!(err.found, "x");
        assert_eq!(
            err.to_string(),
            "Parse error at line 2, column 1: expected 'b' or 'c' but found 'x'"
        );
    }

    #[test]
    fn test_lookahead_failures_not_recorded() {
        let mut ctx = ParseContext::new(&CompileOptions::default());
        ctx.enter_lookahead();
        ctx.record_failure(3, || "'x'".to_string());
        ctx.exit_lookahead();
        assert!(!ctx.in_lookahead());

        let err = ctx.syntax_error("ab cd", 0, false);
        assert_eq!(err.offset, 0);
        assert!(err.expected.is_empty());
    }

    #[test]
    fn test_trailing_error() {
        let ctx = ParseContext::new(&CompileOptions::default());
        let err = ctx.syntax_error("a b", 2, true);
        assert!(err.trailing);
        assert_eq!(
            err.to_string(),
            "Parse error at line 1, column 3: unexpected trailing input 'b'"
        );
    }
}
