use bumpalo::Bump;

use crate::syntax::ast::{Expr, Stmt};
use crate::syntax::lexer::{Lexer, TokenKind};
use crate::syntax::parser::Parser;

#[test]
fn lexer_tracks_line_breaks_and_spacing() {
    let (tokens, errors) = Lexer::new(b"a?.b\nc !d").tokenize();
    assert!(errors.is_empty());
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Question,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::Bang,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
    assert!(!tokens[1].space_before);
    assert!(tokens[4].newline_before);
    assert!(tokens[5].space_before);
}

#[test]
fn lexer_skips_comments() {
    let (tokens, errors) = Lexer::new(b"let x = 1 // trailing\n/* block\n */ x").tokenize();
    assert!(errors.is_empty());
    assert_eq!(tokens.len(), 6);
    assert!(tokens[4].newline_before);
}

#[test]
fn lexer_reports_unterminated_string() {
    let (_, errors) = Lexer::new(b"let s = \"open\nlet t = 1").tokenize();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "unterminated string literal");
}

#[test]
fn parses_function_with_labels() {
    let code = "func f(_ a: SomeClass, osc: SomeClass?, to b: Int) -> Bool {\n  return a == nil\n}\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    match program.statements[0] {
        Stmt::Function {
            name,
            params,
            return_type,
            body,
            ..
        } => {
            assert_eq!(name.name, "f");
            assert_eq!(params.len(), 3);
            assert!(params[0].label.is_none());
            assert_eq!(params[1].label.map(|l| l.name), Some("osc"));
            assert_eq!(params[2].label.map(|l| l.name), Some("to"));
            assert_eq!(params[2].name.name, "b");
            assert!(return_type.is_some());
            assert!(matches!(body[0], Stmt::Return { value: Some(_), .. }));
        }
        other => panic!("expected function stmt, got {:?}", other),
    }
}

#[test]
fn postfix_operators_bind_tightly() {
    let code = "x = sc?.methodA(osc)!.prop\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let Stmt::Assign { value, .. } = program.statements[0] else {
        panic!("expected assignment");
    };
    let Expr::Member { base, name, .. } = value else {
        panic!("expected member access, got {:?}", value);
    };
    assert_eq!(name.name, "prop");
    let Expr::ForceUnwrap { expr, .. } = base else {
        panic!("expected force unwrap, got {:?}", base);
    };
    let Expr::Call { callee, args, .. } = expr else {
        panic!("expected call, got {:?}", expr);
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(callee, Expr::Member { question: Some(_), .. }));
}

#[test]
fn call_does_not_continue_across_lines() {
    let code = "let a = b\n(c)\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn consecutive_statements_need_a_separator() {
    let code = "let a = 1 let b = 2\nlet c = 3; let d = 4\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert_eq!(program.errors.len(), 1);
    assert_eq!(
        program.errors[0].message,
        "consecutive statements on a line must be separated by ';'"
    );
    assert_eq!(program.statements.len(), 4);
}

#[test]
fn recovers_at_the_next_line() {
    let code = "func f() {\n  let = 3\n  let ok = 1\n}\nlet after = 2\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert_eq!(program.errors.len(), 1);
    assert_eq!(program.errors[0].message, "expected pattern");
    assert_eq!(program.statements.len(), 2);
    let Stmt::Function { body, .. } = program.statements[0] else {
        panic!("expected function");
    };
    assert_eq!(body.len(), 1);
}

#[test]
fn else_if_chains_nest() {
    let code = "if a { } else if b { } else { }\n";
    let arena = Bump::new();
    let mut parser = Parser::new(Lexer::new(code.as_bytes()), &arena);
    let program = parser.parse_program();
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);
    let Stmt::If { else_branch, .. } = program.statements[0] else {
        panic!("expected if");
    };
    let nested = else_branch.expect("expected else branch");
    assert!(matches!(nested[0], Stmt::If { else_branch: Some(_), .. }));
}
