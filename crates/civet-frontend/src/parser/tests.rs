use super::*;

fn parse(src: &str) -> Program {
    let out = Parser::new(src).parse_program();
    assert!(out.errors.is_empty(), "parse errors: {:?}", out.errors);
    out.program
}

fn parse_expr(src: &str) -> Expr {
    Parser::new(src).parse_single_expr().expect("expression")
}

#[test]
fn parse_assignment() {
    let prog = parse("$x = 1;");
    assert_eq!(prog.stmts.len(), 1);
    match &prog.stmts[0].kind {
        StmtKind::Expr(expr) => match &expr.kind {
            ExprKind::Assign { op, target, .. } => {
                assert_eq!(*op, AssignOp::Plain);
                assert_eq!(target.simple_var(), Some("x"));
            }
            _ => panic!("expected assignment"),
        },
        _ => panic!("expected expression statement"),
    }
}

#[test]
fn parse_precedence() {
    // 1 + 2 * 3 should be 1 + (2 * 3)
    let expr = parse_expr("1 + 2 * 3");
    match expr.kind {
        ExprKind::Binary { op, right, .. } => {
            assert_eq!(op, BinaryOp::Add);
            match right.kind {
                ExprKind::Binary { op, .. } => assert_eq!(op, BinaryOp::Mul),
                _ => panic!("expected binary on right"),
            }
        }
        _ => panic!("expected binary"),
    }
}

#[test]
fn parse_concat_binds_like_addition() {
    let expr = parse_expr("'a' . 'b' . 'c'");
    match expr.kind {
        ExprKind::Binary { op, left, .. } => {
            assert_eq!(op, BinaryOp::Concat);
            assert!(matches!(
                left.kind,
                ExprKind::Binary {
                    op: BinaryOp::Concat,
                    ..
                }
            ));
        }
        _ => panic!("expected concat"),
    }
}

#[test]
fn parse_function_decl() {
    let prog = parse("function f(int $x, &$y, ...$rest) { return $x; }");
    match &prog.stmts[0].kind {
        StmtKind::Function(decl) => {
            assert_eq!(decl.name, "f");
            assert_eq!(decl.params.len(), 3);
            assert_eq!(decl.params[0].hint.as_ref().unwrap().join(), "int");
            assert!(decl.params[1].by_ref);
            assert!(decl.params[2].variadic);
        }
        _ => panic!("expected function"),
    }
}

#[test]
fn parse_class_with_members() {
    let prog = parse(
        r#"class A extends B implements C {
            use T;
            const FOO = 1;
            private static $count = 0;
            protected function m($a) { }
        }"#,
    );
    match &prog.stmts[0].kind {
        StmtKind::Class(decl) => {
            assert_eq!(decl.name, "A");
            assert_eq!(decl.extends.as_ref().unwrap().join(), "B");
            assert_eq!(decl.implements.len(), 1);
            assert_eq!(decl.trait_uses.len(), 1);
            assert_eq!(decl.consts.len(), 1);
            assert_eq!(decl.properties.len(), 1);
            assert!(decl.properties[0].is_static);
            assert_eq!(decl.properties[0].visibility, Visibility::Private);
            assert_eq!(decl.methods.len(), 1);
            assert_eq!(decl.methods[0].visibility, Visibility::Protected);
        }
        _ => panic!("expected class"),
    }
}

#[test]
fn parse_if_elseif_else() {
    let prog = parse("if ($a) { } elseif ($b) { } else if ($c) { } else { }");
    match &prog.stmts[0].kind {
        StmtKind::If(stmt) => {
            assert_eq!(stmt.elseifs.len(), 2);
            assert!(stmt.otherwise.is_some());
        }
        _ => panic!("expected if"),
    }
}

#[test]
fn parse_braceless_bodies_normalize_to_blocks() {
    let prog = parse("if ($a) $b = 1; else $b = 2;");
    match &prog.stmts[0].kind {
        StmtKind::If(stmt) => {
            assert_eq!(stmt.then.len(), 1);
            assert_eq!(stmt.otherwise.as_ref().unwrap().len(), 1);
        }
        _ => panic!("expected if"),
    }
}

#[test]
fn parse_switch_cases() {
    let prog = parse(
        r#"switch ($x) {
            case 1:
                echo 1;
                break;
            default:
                echo 2;
        }"#,
    );
    match &prog.stmts[0].kind {
        StmtKind::Switch { cases, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(cases[0].cond.is_some());
            assert!(cases[1].cond.is_none());
            assert_eq!(cases[0].body.len(), 2);
        }
        _ => panic!("expected switch"),
    }
}

#[test]
fn parse_foreach_with_key_and_ref() {
    let prog = parse("foreach ($xs as $k => &$v) { }");
    match &prog.stmts[0].kind {
        StmtKind::Foreach(stmt) => {
            assert!(stmt.key.is_some());
            assert!(stmt.by_ref);
            assert_eq!(stmt.value.simple_var(), Some("v"));
        }
        _ => panic!("expected foreach"),
    }
}

#[test]
fn parse_try_catch_finally() {
    let prog = parse("try { } catch (A | B $e) { } finally { }");
    match &prog.stmts[0].kind {
        StmtKind::Try(stmt) => {
            assert_eq!(stmt.catches.len(), 1);
            assert_eq!(stmt.catches[0].types.len(), 2);
            assert_eq!(stmt.catches[0].var, "e");
            assert!(stmt.finally.is_some());
        }
        _ => panic!("expected try"),
    }
}

#[test]
fn parse_closure_with_uses() {
    let expr = parse_expr("function ($a) use ($b, &$c) { return $a; }");
    match expr.kind {
        ExprKind::Closure(closure) => {
            assert_eq!(closure.params.len(), 1);
            assert_eq!(closure.uses.len(), 2);
            assert!(!closure.uses[0].by_ref);
            assert!(closure.uses[1].by_ref);
        }
        _ => panic!("expected closure"),
    }
}

#[test]
fn parse_calls() {
    let expr = parse_expr("$a->m(1)");
    assert!(matches!(expr.kind, ExprKind::MethodCall { .. }));
    let expr = parse_expr("A::m(1)");
    assert!(matches!(expr.kind, ExprKind::StaticCall { .. }));
    let expr = parse_expr("\\Foo\\bar(1, ...$rest)");
    match expr.kind {
        ExprKind::FuncCall { name, args, .. } => {
            let name = name.unwrap();
            assert!(name.fully_qualified);
            assert_eq!(name.join(), "Foo\\bar");
            assert!(args[1].unpack);
        }
        _ => panic!("expected call"),
    }
}

#[test]
fn parse_static_members() {
    let expr = parse_expr("A::$prop");
    assert!(matches!(expr.kind, ExprKind::StaticProp { .. }));
    let expr = parse_expr("A::FOO");
    assert!(matches!(expr.kind, ExprKind::ClassConst { .. }));
    let expr = parse_expr("static::make()");
    match expr.kind {
        ExprKind::StaticCall { class, .. } => match class {
            ClassRef::Name(name) => assert_eq!(name.join(), "static"),
            _ => panic!("expected name"),
        },
        _ => panic!("expected static call"),
    }
}

#[test]
fn parse_cast_vs_parens() {
    let expr = parse_expr("(int)$x");
    assert!(matches!(
        expr.kind,
        ExprKind::Cast {
            kind: CastKind::Int,
            ..
        }
    ));
    let expr = parse_expr("($x)");
    assert!(matches!(expr.kind, ExprKind::Var(_)));
}

#[test]
fn parse_arrays() {
    let expr = parse_expr("[1, 'k' => 2]");
    match expr.kind {
        ExprKind::Array { items, short } => {
            assert!(short);
            assert_eq!(items.len(), 2);
            assert!(items[0].key.is_none());
            assert!(items[1].key.is_some());
        }
        _ => panic!("expected array"),
    }
    let expr = parse_expr("array(1)");
    assert!(matches!(
        expr.kind,
        ExprKind::Array { short: false, .. }
    ));
}

#[test]
fn parse_reference_assignment() {
    let expr = parse_expr("$a = &$b");
    match expr.kind {
        ExprKind::Assign { op, .. } => assert_eq!(op, AssignOp::Reference),
        _ => panic!("expected assignment"),
    }
}

#[test]
fn parse_error_recovers_at_statement_boundary() {
    let out = Parser::new("$a = ; $b = 2;").parse_program();
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.program.stmts.len(), 1);
}

#[test]
fn doc_comment_attaches_to_function() {
    let prog = parse("/** @param int $x */\nfunction f($x) { }");
    match &prog.stmts[0].kind {
        StmtKind::Function(decl) => assert!(decl.doc.is_some()),
        _ => panic!("expected function"),
    }
}

#[test]
fn comments_attach_to_following_case() {
    let prog = parse(
        r#"switch ($x) {
            case 1:
                echo 1;
                // fallthrough
            case 2:
                break;
        }"#,
    );
    match &prog.stmts[0].kind {
        StmtKind::Switch { cases, .. } => {
            assert!(cases[1].leading.iter().any(|c| c.text.contains("fallthrough")));
        }
        _ => panic!("expected switch"),
    }
}
