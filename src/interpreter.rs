//! Pass 1: recursive descent over the lowered productions
//!
//! Alternatives are tried in order and the first that succeeds wins. Before
//! each further alternative, and when a rule fails, everything recorded since
//! the rule was entered is rolled back: emitted tokens with their constants and
//! labels, the source cursor and line, the active context and label state.

use crate::grammar::{Alternative, Element, Grammar, Production, Repetition, Symbol};
use crate::input_stream::InputStream;
use crate::parse_context::{Checkpoint, CompileError, CompileOptions, ExecutePolicy, ParseContext};
use crate::pass2::{run_pass2, Pass2Actions};
use crate::token_stream::{TokenRecord, TokenStream};
use crate::symbols::TokenId;

pub(crate) struct Interpreter<'a, A: Pass2Actions + ?Sized> {
    grammar: &'a Grammar,
    input: InputStream<'a>,
    stream: TokenStream,
    ctx: ParseContext,
    actions: &'a mut A,
    policy: ExecutePolicy,
    /// First record pass 2 has not yet visited
    pass2_position: usize,
}

impl<'a, A: Pass2Actions + ?Sized> Interpreter<'a, A> {
    pub(crate) fn new(
        grammar: &'a Grammar,
        source: &'a str,
        options: &CompileOptions,
        actions: &'a mut A,
    ) -> Self {
        Interpreter {
            grammar,
            input: InputStream::new(source, grammar.scanner_config()),
            stream: TokenStream::new(),
            ctx: ParseContext::new(options),
            actions,
            policy: options.execute_policy,
            pass2_position: 0,
        }
    }

    /// Run pass 1 from the start rule, then the final pass 2
    pub(crate) fn run(mut self) -> Result<TokenStream, CompileError> {
        let grammar = self.grammar;
        let passed = self.process_rule(grammar.start())?;
        let stopped_at = self.input.position();
        let trailing = passed && self.input.position_to_next_symbol();

        if !passed || trailing {
            let at = if trailing { self.input.position() } else { stopped_at };
            let err = self.ctx.syntax_error(self.input.source(), at, trailing);
            log::debug!("pass 1 rejected source: {}", err);
            return Err(CompileError::Syntax(err));
        }

        self.execute()?;
        log::debug!(
            "compiled {} tokens in {} steps",
            self.stream.len(),
            self.ctx.steps()
        );
        Ok(self.stream)
    }

    fn process_rule(&mut self, production: &'a Production) -> Result<bool, CompileError> {
        self.ctx.enter_rule(&production.name, self.input.position())?;
        log::trace!(
            "enter <{}> at line {}, offset {}",
            production.name,
            self.input.line(),
            self.input.position()
        );

        let checkpoint = self.checkpoint();
        let mut passed = false;
        for (n, alternative) in production.alternatives.iter().enumerate() {
            if n > 0 {
                self.rollback(&checkpoint);
            }
            if self.process_alternative(alternative, production.token)? {
                passed = true;
                break;
            }
        }
        if !passed {
            self.rollback(&checkpoint);
        }
        self.ctx.exit_rule();
        log::trace!("exit <{}> {}", production.name, if passed { "matched" } else { "failed" });

        let interleaved = self.policy == ExecutePolicy::Interleaved && !self.ctx.in_lookahead();
        if passed && production.execute && interleaved {
            self.execute()?;
        }
        Ok(passed)
    }

    fn process_alternative(
        &mut self,
        alternative: &'a Alternative,
        rule: TokenId,
    ) -> Result<bool, CompileError> {
        for element in &alternative.elements {
            self.ctx.check_step_limit()?;
            match element.repetition {
                Repetition::Required => {
                    if !self.validate(element, rule)? {
                        return Ok(false);
                    }
                }
                Repetition::Optional => {
                    self.validate(element, rule)?;
                }
                Repetition::NotTest => {
                    if self.lookahead(element, rule)? {
                        return Ok(false);
                    }
                }
                Repetition::Repeat => {
                    let mut last = self.input.position();
                    while self.validate(element, rule)? {
                        // a match that consumed nothing would repeat forever
                        if self.input.position() <= last {
                            break;
                        }
                        last = self.input.position();
                        self.ctx.check_step_limit()?;
                    }
                }
            }
        }
        Ok(true)
    }

    fn validate(&mut self, element: &'a Element, rule: TokenId) -> Result<bool, CompileError> {
        let info = self.grammar.symbols().by_slot(element.slot);
        if !self.ctx.active_context.allows(info.context.required) {
            return Ok(false);
        }

        match &element.symbol {
            Symbol::NonTerminal(index) => {
                let grammar = self.grammar;
                self.process_rule(&grammar.productions()[*index])
            }
            Symbol::NoSpaceSkip => {
                self.stream.end_label();
                self.ctx.no_space_skip = true;
                Ok(true)
            }
            _ => Ok(self.match_terminal(element, rule)),
        }
    }

    /// Try `element` without keeping anything it matched; true if it matched
    fn lookahead(&mut self, element: &'a Element, rule: TokenId) -> Result<bool, CompileError> {
        let checkpoint = self.checkpoint();
        self.ctx.enter_lookahead();
        let matched = self.validate(element, rule);
        self.ctx.exit_lookahead();
        self.rollback(&checkpoint);
        let matched = matched?;

        if matched {
            let mut at = self.input.clone();
            at.position_to_next_symbol();
            let grammar = self.grammar;
            self.ctx.record_failure(at.position(), || {
                format!("anything but {}", element.describe(grammar))
            });
        }
        Ok(matched)
    }

    fn match_terminal(&mut self, element: &'a Element, rule: TokenId) -> bool {
        let is_char = matches!(element.symbol, Symbol::CharSet(_));
        if !is_char {
            self.stream.end_label();
            self.ctx.no_space_skip = false;
        }

        let at_symbol = if self.ctx.no_space_skip {
            !self.input.is_eof()
        } else {
            self.input.position_to_next_symbol()
        };
        let offset = self.input.position();
        let line = self.input.line();

        let matched = if at_symbol {
            match &element.symbol {
                Symbol::Literal {
                    text,
                    case_sensitive,
                } => self.input.match_literal(text, *case_sensitive),
                Symbol::Value => self.input.scan_number().map(|(value, len)| {
                    self.stream.insert_constant(self.stream.len(), value);
                    len
                }),
                Symbol::CharSet(set) => match self.input.current() {
                    Some(ch) if set.contains(ch) => {
                        if !self.stream.label_active() {
                            self.stream.begin_label();
                            self.ctx.no_space_skip = true;
                        }
                        self.stream.push_label_char(ch);
                        Some(ch.len_utf8())
                    }
                    _ => None,
                },
                Symbol::NonTerminal(_) | Symbol::NoSpaceSkip => None,
            }
        } else {
            None
        };

        let Some(len) = matched else {
            let grammar = self.grammar;
            self.ctx.record_failure(offset, || element.describe(grammar));
            return false;
        };

        // one Character record per label
        let suppressed = element.token == TokenId::NoToken
            || (is_char && self.stream.len() > self.stream.label_key());
        if !suppressed {
            log::trace!("emit {} at line {}, offset {}", element.token, line, offset);
            self.stream.push(TokenRecord {
                token: element.token,
                rule,
                line,
                offset,
            });
        }
        self.input.advance(len);

        let info = self.grammar.symbols().by_slot(element.slot);
        self.ctx.active_context = self.ctx.active_context.apply(&info.context);
        true
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tokens: self.stream.len(),
            position: self.input.position(),
            line: self.input.line(),
            context: self.ctx.active_context,
            no_space_skip: self.ctx.no_space_skip,
            label: self.stream.label_mark(),
        }
    }

    fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.stream.truncate(checkpoint.tokens);
        self.stream.restore_label(checkpoint.label);
        self.input.reset(checkpoint.position, checkpoint.line);
        self.ctx.active_context = checkpoint.context;
        self.ctx.no_space_skip = checkpoint.no_space_skip;
        // records already executed cannot be taken back
        self.pass2_position = self.pass2_position.min(checkpoint.tokens);
    }

    fn execute(&mut self) -> Result<(), CompileError> {
        log::debug!("pass 2 from record {} of {}", self.pass2_position, self.stream.len());
        self.pass2_position = run_pass2(
            &self.stream,
            self.grammar.symbols(),
            self.pass2_position,
            &mut *self.actions,
        )?;
        Ok(())
    }
}
