//! Loading grammars from BNF text

use rstest::rstest;
use twopass::{
    build_rule_path, parse_bnf_grammar, CompileError, GrammarAnalysis, GrammarError, LexemeTable,
    RulePath, RulePathBuilder, TokenId,
};

const MATERIAL_GRAMMAR: &str = r#"
// material script
<script> ::= {<material>} ;
<material> ::= 'material' <name> '{' {<pass>} '}' ;!
<pass> ::= 'pass' [<#weight>] [-','] ;
<name> ::= (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz_0123456789)} ;
"#;

fn registered() -> LexemeTable {
    let mut lexemes = LexemeTable::new();
    lexemes
        .add_rule("a", 1)
        .add_rule("b", 2)
        .add("x", 10, false)
        .add("y", 11, false);
    lexemes
}

#[rstest]
#[case::single_terminal("<a> ::= 'x' ;", RulePathBuilder::new().rule(1, "a").and((10, "x")).end())]
#[case::double_quotes(
    "<a> ::= \"x\" 'y' ;",
    RulePathBuilder::new().rule(1, "a").and((10, "x")).and((11, "y")).end()
)]
#[case::alternatives(
    "<a> ::= 'x' | <b> ; <b> ::= 'y' ;",
    RulePathBuilder::new().rule(1, "a").and((10, "x")).or(2).end().rule(2, "b").and((11, "y")).end()
)]
#[case::optional_and_repeat(
    "<a> ::= ['x'] {'y'} ;",
    RulePathBuilder::new().rule(1, "a").optional((10, "x")).repeat((11, "y")).end()
)]
#[case::execute(
    "<a> ::= 'x' ;!",
    RulePathBuilder::new().rule(1, "a").and((10, "x")).end_and_execute()
)]
#[case::suppressed(
    "<a> ::= -'x' 'y' ;",
    RulePathBuilder::new().rule(1, "a").and((TokenId::NoToken, "x")).and((11, "y")).end()
)]
#[case::constant_and_set(
    "<a> ::= <#> (0123) ;",
    RulePathBuilder::new().rule(1, "a").and(TokenId::Value).and((TokenId::Character, "0123")).end()
)]
#[case::not_test(
    "<a> ::= 'x' (?!'y') ;",
    RulePathBuilder::new().rule(1, "a").and((10, "x")).not_test((11, "y")).end()
)]
#[case::no_space_skip(
    "<a> ::= 'x' @ 'y' ;",
    RulePathBuilder::new()
        .rule(1, "a")
        .and((10, "x"))
        .and(TokenId::NoSpaceSkip)
        .and((11, "y"))
        .end()
)]
#[case::set_starting_like_not_test(
    "<a> ::= (?!) ;",
    RulePathBuilder::new().rule(1, "a").and((TokenId::Character, "?!")).end()
)]
#[case::comments_and_lines(
    "// first\n<a> ::= 'x' // trailing\n  ;\n",
    RulePathBuilder::new().rule(1, "a").and((10, "x")).end()
)]
fn test_bnf_builds_rule_path(#[case] text: &str, #[case] expected: RulePathBuilder) {
    let (path, _) = build_rule_path(text, &registered()).unwrap();
    assert_eq!(path, expected.build());
}

#[rstest]
#[case::missing_semicolon("<a> ::= 'x'")]
#[case::missing_assignment("<a> 'x' ;")]
#[case::empty_expression("<a> ::= ;")]
#[case::bad_identifier("<9a> ::= 'x' ;")]
#[case::unclosed_set("<a> ::= (abc ;")]
fn test_bnf_syntax_errors(#[case] text: &str) {
    let err = build_rule_path(text, &LexemeTable::new()).unwrap_err();
    assert!(matches!(err, GrammarError::Bnf(CompileError::Syntax(_))), "{:?}", err);
}

#[test]
fn test_bnf_error_reports_position() {
    let err = build_rule_path("<a> ::= 'x' ;\n<b> ::= 'y'", &LexemeTable::new()).unwrap_err();
    let GrammarError::Bnf(CompileError::Syntax(syntax)) = err else {
        panic!("expected a syntax error, got {:?}", err);
    };
    assert_eq!(syntax.line, 2);
    assert!(syntax.expected.contains(&"';'".to_string()), "{:?}", syntax.expected);
}

#[test]
fn test_round_trip_through_bnf() {
    let (path, _) = build_rule_path(MATERIAL_GRAMMAR, &LexemeTable::new()).unwrap();
    insta::assert_snapshot!(path.to_bnf().trim_end(), @r###"
    <script> ::= {<material>} ;
    <material> ::= 'material' <name> '{' {<pass>} '}' ;!
    <pass> ::= 'pass' [<#>] [-','] ;
    <name> ::= (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz_0123456789)} ;
    "###);

    // the rendered text loads back into the same table
    let (again, _) = build_rule_path(&path.to_bnf(), &LexemeTable::new()).unwrap();
    assert_eq!(again, path);
}

#[test]
fn test_round_trip_of_lookahead_and_no_space_skip() {
    let text = "<num> ::= <digit> @ {<digit>} (?!'.') ;\n<digit> ::= (0123456789) ;\n";
    let (path, _) = build_rule_path(text, &LexemeTable::new()).unwrap();
    assert_eq!(path.to_bnf(), text);

    let (again, _) = build_rule_path(&path.to_bnf(), &LexemeTable::new()).unwrap();
    assert_eq!(again, path);
}

#[test]
fn test_exhausted_id_space_is_an_error() {
    let mut lexemes = LexemeTable::new();
    lexemes.add("x", u32::MAX, false);

    let err = parse_bnf_grammar("<a> ::= 'x' 'y' ;", &lexemes).unwrap_err();
    assert!(
        matches!(&err, GrammarError::IdSpaceExhausted { lexeme } if lexeme == "<a>"),
        "{:?}",
        err
    );

    // nothing needs a fresh id when every lexeme is registered
    lexemes.add_rule("a", 1);
    assert!(parse_bnf_grammar("<a> ::= 'x' ;", &lexemes).is_ok());
}

#[test]
fn test_registered_ids_are_kept() {
    let mut lexemes = LexemeTable::new();
    lexemes.add_rule("script", 100).add("material", 7, true);

    let grammar = parse_bnf_grammar(MATERIAL_GRAMMAR, &lexemes).unwrap();
    assert_eq!(grammar.start().token, TokenId::User(100));
    assert!(grammar.symbols().has_action(TokenId::User(7)));
    assert_eq!(grammar.token_name(TokenId::User(7)), "material");

    // unregistered lexemes are numbered above the registered ones
    let start = grammar.production_for(TokenId::User(100)).unwrap();
    assert_eq!(start.name, "script");
    let fresh: Vec<u32> = grammar
        .symbols()
        .iter()
        .filter_map(|info| match info.id {
            TokenId::User(id) if id != 7 && id != 100 => Some(id),
            _ => None,
        })
        .collect();
    assert!(fresh.iter().all(|&id| id > 100), "{:?}", fresh);
}

#[rstest]
#[case::duplicate("<a> ::= 'x' ; <a> ::= 'y' ;")]
#[case::undefined("<a> ::= <missing> ;")]
#[case::empty_literal("<a> ::= '' ;")]
#[case::modifier_after_or("<a> ::= 'x' | ['y'] ;")]
fn test_grammar_errors(#[case] text: &str) {
    let err = parse_bnf_grammar(text, &LexemeTable::new()).unwrap_err();
    assert!(
        matches!(
            err,
            GrammarError::DuplicateRule { .. }
                | GrammarError::UndefinedRule { .. }
                | GrammarError::EmptyLiteral { .. }
                | GrammarError::ModifierAfterOr { .. }
        ),
        "{:?}",
        err
    );
}

#[test]
fn test_analysis_of_loaded_grammar() {
    let grammar = parse_bnf_grammar(
        "<expr> ::= <expr> '+' <#> | <#> ; <unused> ::= 'u' ;",
        &LexemeTable::new(),
    )
    .unwrap();
    let analysis = GrammarAnalysis::analyze(&grammar);
    assert!(analysis.is_left_recursive("expr"));
    assert!(analysis.unreachable_rules.contains("unused"));
    insta::assert_snapshot!(analysis.report().trim_end(), @r###"
    Left-recursive rules (will hit the depth limit):
       - <expr>

    Unreachable rules:
       - <unused>
    "###);
}

#[test]
fn test_empty_rule_path_is_rejected() {
    let err = twopass::Grammar::new(RulePath::new(), twopass::SymbolTable::new()).unwrap_err();
    assert!(matches!(err, GrammarError::EmptyGrammar));
}
