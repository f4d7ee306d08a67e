//! Grammar Analysis
//!
//! Inspects lowered productions without modifying them. Left recursion is
//! reported because recursive descent can only escape it through the depth
//! limit; unreachable and nullable rules help when debugging a grammar.

use crate::grammar::{Alternative, Grammar, Repetition, Symbol};
use std::collections::{BTreeMap, BTreeSet};

/// Analysis results for a grammar
#[derive(Debug, Clone, Default)]
pub struct GrammarAnalysis {
    /// Rules that are recursive (directly or indirectly)
    pub recursive_rules: BTreeSet<String>,

    /// Rules whose leading symbols can derive the rule itself
    pub left_recursive_rules: BTreeSet<String>,

    /// Rules that can succeed without consuming input
    pub nullable_rules: BTreeSet<String>,

    /// Rules never reached from the start rule
    pub unreachable_rules: BTreeSet<String>,

    /// Alternatives plus elements per rule
    pub complexity_scores: BTreeMap<String, usize>,
}

impl GrammarAnalysis {
    pub fn analyze(grammar: &Grammar) -> Self {
        let productions = grammar.productions();
        let nullable = compute_nullable(grammar);

        // all references, and references that can be reached before any input is consumed
        let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); productions.len()];
        let mut left_edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); productions.len()];
        for (index, production) in productions.iter().enumerate() {
            for alternative in &production.alternatives {
                let mut leading = true;
                for element in &alternative.elements {
                    if let Symbol::NonTerminal(target) = element.symbol {
                        edges[index].insert(target);
                        if leading {
                            left_edges[index].insert(target);
                        }
                    }
                    let skippable = element.repetition != Repetition::Required
                        || match element.symbol {
                            Symbol::NonTerminal(target) => nullable[target],
                            Symbol::NoSpaceSkip => true,
                            _ => false,
                        };
                    leading &= skippable;
                }
            }
        }

        let name = |index: usize| productions[index].name.clone();
        let recursive_rules = (0..productions.len())
            .filter(|&index| reaches(&edges, index, index))
            .map(name)
            .collect();
        let left_recursive_rules = (0..productions.len())
            .filter(|&index| reaches(&left_edges, index, index))
            .map(name)
            .collect();
        let nullable_rules = (0..productions.len())
            .filter(|&index| nullable[index])
            .map(name)
            .collect();
        let unreachable_rules = (1..productions.len())
            .filter(|&index| !reaches(&edges, 0, index))
            .map(name)
            .collect();
        let complexity_scores = productions
            .iter()
            .map(|production| {
                let score = calculate_complexity(&production.alternatives);
                (production.name.clone(), score)
            })
            .collect();

        GrammarAnalysis {
            recursive_rules,
            left_recursive_rules,
            nullable_rules,
            unreachable_rules,
            complexity_scores,
        }
    }

    pub fn is_recursive(&self, rule_name: &str) -> bool {
        self.recursive_rules.contains(rule_name)
    }

    pub fn is_left_recursive(&self, rule_name: &str) -> bool {
        self.left_recursive_rules.contains(rule_name)
    }

    pub fn complexity(&self, rule_name: &str) -> usize {
        self.complexity_scores.get(rule_name).copied().unwrap_or(0)
    }

    /// Get human-readable report of grammar issues
    pub fn report(&self) -> String {
        let mut report = String::new();

        if !self.left_recursive_rules.is_empty() {
            report.push_str("Left-recursive rules (will hit the depth limit):\n");
            for rule in &self.left_recursive_rules {
                report.push_str(&format!("   - <{}>\n", rule));
            }
            report.push('\n');
        }

        if !self.unreachable_rules.is_empty() {
            report.push_str("Unreachable rules:\n");
            for rule in &self.unreachable_rules {
                report.push_str(&format!("   - <{}>\n", rule));
            }
            report.push('\n');
        }

        let plain_recursive: Vec<_> = self
            .recursive_rules
            .iter()
            .filter(|rule| !self.left_recursive_rules.contains(*rule))
            .collect();
        if !plain_recursive.is_empty() {
            report.push_str("Recursive rules:\n");
            for rule in plain_recursive {
                report.push_str(&format!("   - <{}>\n", rule));
            }
            report.push('\n');
        }

        if report.is_empty() {
            report.push_str("No issues detected\n");
        }

        report
    }
}

/// Returns true if `to` can be reached from `from` in one or more steps
fn reaches(edges: &[BTreeSet<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; edges.len()];
    let mut stack: Vec<usize> = edges[from].iter().copied().collect();
    while let Some(next) = stack.pop() {
        if next == to {
            return true;
        }
        if !std::mem::replace(&mut seen[next], true) {
            stack.extend(edges[next].iter().copied());
        }
    }
    false
}

/// Fixpoint over productions: nullable if some alternative has only skippable elements
fn compute_nullable(grammar: &Grammar) -> Vec<bool> {
    let productions = grammar.productions();
    let mut nullable = vec![false; productions.len()];
    let mut changed = true;

    while changed {
        changed = false;
        for (index, production) in productions.iter().enumerate() {
            if nullable[index] {
                continue;
            }
            let any_empty = production.alternatives.iter().any(|alternative| {
                alternative.elements.iter().all(|element| {
                    element.repetition != Repetition::Required
                        || match element.symbol {
                            Symbol::NonTerminal(target) => nullable[target],
                            Symbol::NoSpaceSkip => true,
                            _ => false,
                        }
                })
            });
            if any_empty {
                nullable[index] = true;
                changed = true;
            }
        }
    }

    nullable
}

fn calculate_complexity(alternatives: &[Alternative]) -> usize {
    alternatives.len() + alternatives.iter().map(|alt| alt.elements.len()).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_path::RulePathBuilder;
    use crate::symbols::{SymbolTable, TokenId};

    fn grammar(builder: RulePathBuilder, rules: &[u32]) -> Grammar {
        let mut symbols = SymbolTable::new();
        for &id in rules {
            symbols.define_nonterminal(id);
        }
        symbols.define_terminal(10, false);
        symbols.define_terminal(11, false);
        Grammar::new(builder.build(), symbols).unwrap()
    }

    #[test]
    fn test_detect_left_recursion() {
        // <expr> ::= [<sign>] <expr> '+' | 'x' ; <sign> ::= '-'
        let g = grammar(
            RulePathBuilder::new()
                .rule(1, "expr")
                .optional(2)
                .and(1)
                .and((10, "+"))
                .or((11, "x"))
                .end()
                .rule(2, "sign")
                .and((10, "-"))
                .end(),
            &[1, 2],
        );
        let analysis = GrammarAnalysis::analyze(&g);
        assert!(analysis.is_left_recursive("expr"));
        assert!(analysis.is_recursive("expr"));
        assert!(!analysis.is_recursive("sign"));
        assert!(analysis.report().contains("<expr>"));
    }

    #[test]
    fn test_no_left_recursion() {
        // <list> ::= '(' {<list>} ')'
        let g = grammar(
            RulePathBuilder::new()
                .rule(1, "list")
                .and((10, "("))
                .repeat(1)
                .and((11, ")"))
                .end(),
            &[1],
        );
        let analysis = GrammarAnalysis::analyze(&g);
        assert!(analysis.is_recursive("list"));
        assert!(!analysis.is_left_recursive("list"));
        assert!(analysis.nullable_rules.is_empty());
    }

    #[test]
    fn test_nullable_and_unreachable() {
        let g = grammar(
            RulePathBuilder::new()
                .rule(1, "start")
                .and(2)
                .and((10, "a"))
                .end()
                .rule(2, "maybe")
                .or((11, "b"))
                .end()
                .rule(3, "orphan")
                .and(TokenId::Value)
                .end(),
            &[1, 2, 3],
        );
        let analysis = GrammarAnalysis::analyze(&g);
        assert!(analysis.nullable_rules.contains("maybe"));
        assert!(!analysis.nullable_rules.contains("start"));
        assert_eq!(analysis.unreachable_rules.iter().collect::<Vec<_>>(), vec!["orphan"]);
        assert_eq!(analysis.complexity("start"), 3);
    }
}
