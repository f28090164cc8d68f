use super::*;
use crate::analyzer;
use crate::lexer;
use crate::parser;
use crate::regen::regenerate;
use crate::symtab::SymbolTable;

/// 辅助函数：解析一段没有语法错误的源代码。
fn parse_ok(source: &str) -> Ast {
    let tokens = lexer::lex(source);
    let mut table = SymbolTable::new().unwrap();
    let output = parser::parse(&tokens, &mut table).unwrap();
    assert!(
        output.diagnostics.is_empty(),
        "Parser failed unexpectedly for source: {}\n{:?}",
        source,
        output.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>()
    );
    output.ast
}

/// 辅助函数：只运行一个遍，返回压缩后的树与应用记录。
fn run_pass(pass: &dyn Pass, ast: &Ast) -> (Ast, Vec<String>) {
    let mut cx = PassContext::new(ast.clone(), None);
    pass.run(&mut cx);
    (cx.ast.compact(&cx.shared), cx.applied)
}

fn top(ast: &Ast) -> Vec<NodeId> {
    ast.statements(ast.root()).to_vec()
}

/// 变量声明的初始值。
fn init(ast: &Ast, decl: NodeId) -> NodeId {
    ast.var_decl_parts(decl).unwrap().2.unwrap()
}

// --- 常量折叠 ---

#[test]
fn test_fold_integer_addition() {
    let ast = parse_ok("int x = 2 + 3;");
    let (out, applied) = run_pass(&ConstantFolding, &ast);
    let value = init(&out, top(&out)[0]);
    assert_eq!(out.kind(value), NodeKind::Number);
    assert_eq!(out.value(value), Some("5"));
    assert_eq!(applied, vec!["Constant folding: 2 + 3 = 5"]);
}

#[test]
fn test_fold_nested_and_modulo() {
    let ast = parse_ok("int a = 2 * 3 + 4;\nint b = 7 % 3;\nint c = 7 / 2;\nint d = 2 - 5;");
    let (out, applied) = run_pass(&ConstantFolding, &ast);
    let values: Vec<_> = top(&out).iter().map(|&s| out.value(init(&out, s))).collect();
    assert_eq!(values, vec![Some("10"), Some("1"), Some("3"), Some("-3")]);
    assert_eq!(applied.len(), 5);
}

#[test]
fn test_fold_float_keeps_decimal_point() {
    let ast = parse_ok("float f = 1.5 * 2;\nfloat g = 0.5 + 0.25;");
    let (out, _) = run_pass(&ConstantFolding, &ast);
    let stmts = top(&out);
    assert_eq!(out.value(init(&out, stmts[0])), Some("3.0"));
    assert_eq!(out.value(init(&out, stmts[1])), Some("0.75"));
}

#[test]
fn test_fold_leaves_division_by_zero() {
    let ast = parse_ok("int x = 4 / 0;\nint y = a / 0;\nint z = 4 % 0;");
    let (out, applied) = run_pass(&ConstantFolding, &ast);
    assert!(applied.is_empty());
    for stmt in top(&out) {
        let value = init(&out, stmt);
        assert_eq!(out.kind(value), NodeKind::Operation);
    }
    assert_eq!(regenerate(&out), regenerate(&ast));
}

#[test]
fn test_fold_keeps_overflow_and_malformed_literals() {
    let ast = parse_ok("int x = 9223372036854775807 + 1;\nint y = 99999999999999999999 * 2;");
    let (out, applied) = run_pass(&ConstantFolding, &ast);
    assert!(applied.is_empty());
    for stmt in top(&out) {
        assert_eq!(out.kind(init(&out, stmt)), NodeKind::Operation);
    }
}

#[test]
fn test_fold_is_idempotent() {
    let ast = parse_ok("int x = (1 + 2) * (3 + 4);\nint y = x / 0;");
    let (once, _) = run_pass(&ConstantFolding, &ast);
    let (twice, applied) = run_pass(&ConstantFolding, &once);
    assert!(applied.is_empty());
    assert_eq!(regenerate(&once), regenerate(&twice));
    assert_eq!(out_value(&once), Some("21".to_string()));

    fn out_value(ast: &Ast) -> Option<String> {
        let value = init(ast, top(ast)[0]);
        ast.value(value).map(str::to_string)
    }
}

// --- 代数化简 ---

#[test]
fn test_algebraic_identities() {
    let ast = parse_ok("int a = x + 0;\nint b = 0 + x;\nint c = x * 1;\nint d = 1 * x;\nint e = x * 0;\nint f = 0 * x;");
    let (out, applied) = run_pass(&AlgebraicSimplification, &ast);
    assert_eq!(applied.len(), 6);
    assert_eq!(applied[0], "Algebraic simplification: (x + 0) => x");

    let stmts = top(&out);
    for &stmt in &stmts[..4] {
        let value = init(&out, stmt);
        assert_eq!(out.kind(value), NodeKind::Identifier);
        assert_eq!(out.value(value), Some("x"));
    }
    for &stmt in &stmts[4..] {
        let value = init(&out, stmt);
        assert_eq!(out.kind(value), NodeKind::Number);
        assert_eq!(out.value(value), Some("0"));
    }
}

#[test]
fn test_algebra_is_idempotent() {
    let ast = parse_ok("int y = (x * 1) + 0;\nint z = (x - 0) * 2;");
    let (once, applied) = run_pass(&AlgebraicSimplification, &ast);
    assert_eq!(applied.len(), 2);
    assert_eq!(regenerate(&once), "int y = x;\nint z = ((x - 0) * 2);\n");

    let (twice, applied) = run_pass(&AlgebraicSimplification, &once);
    assert!(applied.is_empty());
    assert_eq!(regenerate(&once), regenerate(&twice));
}

// --- 常量传播 ---

#[test]
fn test_propagation_substitutes_following_reads() {
    let ast = parse_ok("int x = 5;\nint y = x + 1;\nprint(y);");
    let (out, applied) = run_pass(&ConstantPropagation, &ast);
    assert_eq!(regenerate(&out), "int x = 5;\nint y = (5 + 1);\nprint(y);\n");
    assert_eq!(applied, vec!["Constant propagation: x = 5 at line 2"]);
}

#[test]
fn test_propagation_chains_and_stops_at_reassignment() {
    let ast = parse_ok("int x = 1;\nint y = x;\nx = z;\nprint(x, y);");
    let (out, _) = run_pass(&ConstantPropagation, &ast);
    assert_eq!(regenerate(&out), "int x = 1;\nint y = 1;\nx = z;\nprint(x, 1);\n");
}

#[test]
fn test_propagation_skips_loops_and_calls() {
    let source = "int i = 0;\nwhile i < 3 { i++; }\nprint(i);\nint k = 2;\nf();\nprint(k);";
    let ast = parse_ok(source);
    let (out, applied) = run_pass(&ConstantPropagation, &ast);
    assert!(applied.is_empty(), "unexpected rewrites: {:?}", applied);
    assert_eq!(regenerate(&out), regenerate(&ast));
}

#[test]
fn test_propagation_replaces_if_condition_but_not_branches() {
    let ast = parse_ok("int flag = 0;\nif flag == 1 { print(flag); }");
    let (out, _) = run_pass(&ConstantPropagation, &ast);
    assert_eq!(
        regenerate(&out),
        "int flag = 0;\nif (0 == 1) {\n    print(flag);\n}\n"
    );
}

// --- 公共子表达式消除 ---

#[test]
fn test_cse_aliases_first_occurrence() {
    let ast = parse_ok("int c = (a + b) * 2;\nint d = (a + b) * 3;");
    let (out, applied) = run_pass(&CommonSubexpressionElimination, &ast);
    assert_eq!(applied.len(), 1);

    let stmts = top(&out);
    let first = out.child(init(&out, stmts[0]), 0).unwrap();
    let second = out.child(init(&out, stmts[1]), 0).unwrap();
    assert_eq!(first, second);
    assert_eq!(out.parent_counts()[&first], 2);
    // 共享不改变生成的代码
    assert_eq!(regenerate(&out), regenerate(&ast));
}

#[test]
fn test_cse_ignores_calls() {
    let ast = parse_ok("int c = f(a) + 1;\nint d = f(a) + 1;");
    let (_, applied) = run_pass(&CommonSubexpressionElimination, &ast);
    assert!(applied.is_empty());
}

#[test]
fn test_cse_aliasing_survives_full_pipeline() {
    let source = "int f(int p, int q) {\n    int c = (p + q) * 2;\n    int d = (p + q) * 3;\n    return c + d;\n}\nprint(f(1, 2));";
    let ast = parse_ok(source);
    let optimized = optimize(&ast, None);
    let out = &optimized.ast;

    let function = top(out)[0];
    let body = out.statements(function);
    let first = out.child(init(out, body[0]), 0).unwrap();
    let second = out.child(init(out, body[1]), 0).unwrap();
    assert_eq!(first, second);
}

// --- 死代码消除 ---

#[test]
fn test_dce_drops_statements_after_return() {
    let ast = parse_ok("int f() {\n    return 1;\n    print(2);\n    print(3);\n}");
    let (out, applied) = run_pass(&DeadCodeElimination, &ast);
    let function = top(&out)[0];
    assert_eq!(out.statements(function).len(), 1);
    assert_eq!(applied, vec!["Dead code: removed 2 statement(s) after return at line 2"]);
}

#[test]
fn test_dce_constant_conditions() {
    let ast = parse_ok(
        "if false { print(1); } else { print(2); }\n\
         if 1 { print(3); print(4); }\n\
         if 0 { print(5); }\n\
         while false { print(6); }",
    );
    let (out, _) = run_pass(&DeadCodeElimination, &ast);
    let stmts = top(&out);
    let args: Vec<_> = stmts
        .iter()
        .map(|&s| {
            assert_eq!(out.kind(s), NodeKind::IoCall);
            out.value(out.child(s, 0).unwrap()).unwrap().to_string()
        })
        .collect();
    assert_eq!(args, vec!["2", "3", "4"]);
}

#[test]
fn test_dce_false_if_falls_through_to_else_if() {
    let ast = parse_ok("if false { print(1); } else if ready { print(2); }");
    let (out, _) = run_pass(&DeadCodeElimination, &ast);
    let stmts = top(&out);
    assert_eq!(stmts.len(), 1);
    assert_eq!(out.kind(stmts[0]), NodeKind::If);
    assert_eq!(out.value(out.child(stmts[0], 0).unwrap()), Some("ready"));
}

#[test]
fn test_dce_inlined_return_truncates_enclosing_body() {
    let ast = parse_ok("void g() {\n    if true { return; }\n    print(1);\n}");
    let (out, _) = run_pass(&DeadCodeElimination, &ast);
    let function = top(&out)[0];
    let body = out.statements(function);
    assert_eq!(body.len(), 1);
    assert_eq!(out.kind(body[0]), NodeKind::Return);
}

#[test]
fn test_dce_is_idempotent() {
    let ast = parse_ok("int f() {\n    if true { return 1; }\n    return 2;\n}\nif false { print(0); }");
    let (once, _) = run_pass(&DeadCodeElimination, &ast);
    let (twice, applied) = run_pass(&DeadCodeElimination, &once);
    assert!(applied.is_empty());
    assert_eq!(regenerate(&once), regenerate(&twice));
}

// --- 循环展开 ---

#[test]
fn test_unroll_small_range_loop() {
    let ast = parse_ok("for i; i < 3; i++ { print(i); }");
    let optimized = optimize(&ast, None);
    let out = &optimized.ast;
    let stmts = top(out);
    assert_eq!(stmts.len(), 3);
    for (k, &stmt) in stmts.iter().enumerate() {
        assert_eq!(out.kind(stmt), NodeKind::IoCall);
        let arg = out.child(stmt, 0).unwrap();
        assert_eq!(out.kind(arg), NodeKind::Number);
        assert_eq!(out.value(arg), Some(k.to_string().as_str()));
    }
    assert!(optimized.applied.iter().any(|m| m.starts_with("Loop unrolling: i (3 iterations)")));
}

#[test]
fn test_unroll_infers_start_and_restores_final_value() {
    let ast = parse_ok("int i = 1;\nfor i; i <= 2; i++ { print(i * 10); }\nprint(i);");
    let (out, _) = run_pass(&LoopUnrolling, &ast);
    assert_eq!(
        regenerate(&out),
        "int i = 1;\nprint((1 * 10));\nprint((2 * 10));\ni = 3;\nprint(i);\n"
    );
}

#[test]
fn test_unroll_counts_down() {
    let ast = parse_ok("int n = 2;\nfor n; n > 0; n-- { print(n); }");
    let (out, _) = run_pass(&LoopUnrolling, &ast);
    assert_eq!(regenerate(&out), "int n = 2;\nprint(2);\nprint(1);\n");
}

#[test]
fn test_unroll_rejects_unsuitable_loops() {
    let source = "for a; a < 5; a++ { print(a); }\n\
                  for b; b < 2; b++ { b = 7; }\n\
                  for c; c < limit; c++ { print(c); }\n\
                  for d; d > 0; d++ { print(d); }\n\
                  e = read;\n\
                  for e; e < 2; e++ { print(e); }";
    let ast = parse_ok(source);
    let (out, applied) = run_pass(&LoopUnrolling, &ast);
    assert!(applied.is_empty(), "unexpected rewrites: {:?}", applied);
    assert_eq!(regenerate(&out), regenerate(&ast));
}

#[test]
fn test_unroll_keeps_loop_when_trip_count_overflows() {
    let ast = parse_ok("int i = 0;\nfor i; i <= 9223372036854775807; i++ { print(i); }");
    let (out, applied) = run_pass(&LoopUnrolling, &ast);
    assert!(applied.is_empty());
    assert_eq!(regenerate(&out), regenerate(&ast));

    // 迭代次数在范围内，但结束后的值溢出
    let ast = parse_ok("int i = 9223372036854775806;\nfor i; i <= 9223372036854775807; i++ { print(i); }");
    let (out, applied) = run_pass(&LoopUnrolling, &ast);
    assert!(applied.is_empty());
    assert_eq!(regenerate(&out), regenerate(&ast));
}

// --- 循环不变量外提 ---

#[test]
fn test_hoist_invariant_assignment() {
    let ast = parse_ok("int k = 0;\nfor i; i < n; i++ {\n    k = 10;\n    print(i + k);\n}");
    let (out, applied) = run_pass(&LoopInvariantHoisting, &ast);
    assert_eq!(applied.len(), 1);
    assert_eq!(
        regenerate(&out),
        "int k = 0;\nk = 10;\nfor i; (i < n); i++ {\n    print((i + k));\n}\n"
    );
}

#[test]
fn test_hoist_keeps_dependent_statements() {
    let source = "for i; i < n; i++ {\n\
                  x = i * 2;\n\
                  y = y + 1;\n\
                  z = w;\n\
                  w = 3;\n\
                  t = f(1);\n\
                  }";
    let ast = parse_ok(source);
    let (out, applied) = run_pass(&LoopInvariantHoisting, &ast);
    assert!(applied.is_empty(), "unexpected rewrites: {:?}", applied);
    assert_eq!(regenerate(&out), regenerate(&ast));
}

#[test]
fn test_hoist_declaration_into_function_scope() {
    let ast = parse_ok("int i = 0;\nfor i; i < n; i++ {\n    int k = 5;\n    print(i + k);\n}");
    let (out, applied) = run_pass(&LoopInvariantHoisting, &ast);
    assert_eq!(applied.len(), 1);
    assert_eq!(
        regenerate(&out),
        "int i = 0;\nint k = 5;\nfor i; (i < n); i++ {\n    print((i + k));\n}\n"
    );
}

#[test]
fn test_hoist_never_shadows_outer_declarations() {
    let sources = [
        // 外层已经声明了同名变量
        "int t = 1;\nint i = 0;\nfor i; i < n; i++ { int t = 5; print(t + i); }\nprint(t);",
        // 循环条件读取同名的外层变量
        "for i; i < k; i++ { int k = 5; print(i + k); }",
        // 函数参数
        "void f(int k) { for i; i < 3; i++ { int k = 5; print(i + k); } }",
        // if 的块不建立作用域
        "if (n > 0) { for i; i < n; i++ { int k = 5; print(i + k); } }",
    ];
    for source in sources {
        let ast = parse_ok(source);
        let (out, applied) = run_pass(&LoopInvariantHoisting, &ast);
        assert!(applied.is_empty(), "unexpected rewrites for {:?}: {:?}", source, applied);
        assert_eq!(regenerate(&out), regenerate(&ast));
    }
}

#[test]
fn test_hoisted_program_still_analyzes_cleanly() {
    let source = "int t = 1;\nint n = 3;\nint i = 0;\nfor i; i < n; i++ { int t = 5; print(t + i); }\nprint(t);";
    let tokens = lexer::lex(source);
    let mut table = SymbolTable::new().unwrap();
    let parsed = parser::parse(&tokens, &mut table).unwrap();
    let analysis = analyzer::analyze(&parsed.ast, &table).unwrap();
    assert!(analysis.errors.is_empty());

    let optimized = optimize(&parsed.ast, Some(&analysis.symbols));
    let out = &optimized.ast;
    let outer_t = top(out)
        .into_iter()
        .filter(|&s| out.kind(s) == NodeKind::VarDecl && out.value(s) == Some("t"))
        .count();
    assert_eq!(outer_t, 1);
    assert!(regenerate(out).ends_with("print(t);\n"));
}

// --- 循环合并 ---

#[test]
fn test_fuse_adjacent_loops() {
    let ast = parse_ok("for i; i < n; i++ { print(i); }\nfor i; i < n; i++ { print(i * 2); }");
    let (_, applied) = run_pass(&LoopFusion, &ast);
    // 以标识符为界的循环不合并
    assert!(applied.is_empty());

    let ast = parse_ok("for i; i < 9; i++ { print(i); }\nfor i; i < 9; i++ { print(i * 2); }");
    let (out, applied) = run_pass(&LoopFusion, &ast);
    assert_eq!(applied.len(), 1);
    let stmts = top(&out);
    assert_eq!(stmts.len(), 1);
    let block = out.child_of_kind(stmts[0], NodeKind::Block).unwrap();
    assert_eq!(out.statements(block).len(), 2);
}

#[test]
fn test_fusion_requires_same_bounds_and_variable() {
    let ast = parse_ok(
        "for i; i < 9; i++ { print(i); }\n\
         for i; i < 8; i++ { print(i); }\n\
         for j; j < 8; j++ { print(j); }",
    );
    let (_, applied) = run_pass(&LoopFusion, &ast);
    assert!(applied.is_empty());
}

// --- 无用函数 ---

#[test]
fn test_dead_functions_need_symbols() {
    let source = "int used() { return 1; }\nint unused() { return 2; }\nprint(used());";
    let tokens = lexer::lex(source);
    let mut table = SymbolTable::new().unwrap();
    let ast = parser::parse(&tokens, &mut table).unwrap().ast;
    let analysis = analyzer::analyze(&ast, &table).unwrap();
    assert!(!analysis.has_errors());

    let without = optimize(&ast, None);
    assert_eq!(top(&without.ast).len(), 3);

    let with = optimize(&ast, Some(&analysis.symbols));
    let stmts = top(&with.ast);
    assert_eq!(stmts.len(), 2);
    assert_eq!(with.ast.value(stmts[0]), Some("used"));
    assert!(
        with.applied
            .contains(&"Dead function: removed 'unused' declared at line 2".to_string())
    );
}

// --- 整体 ---

#[test]
fn test_optimize_does_not_touch_input() {
    let ast = parse_ok("int x = 2 + 3;\nif false { print(x); }");
    let before = regenerate(&ast);
    let optimized = optimize(&ast, None);
    assert_eq!(regenerate(&ast), before);
    assert_eq!(regenerate(&optimized.ast), "int x = 5;\n");
}

#[test]
fn test_passes_run_in_fixed_order() {
    let names: Vec<_> = standard_passes().iter().map(|p| p.name()).collect();
    assert_eq!(
        names,
        vec![
            "constant folding",
            "algebraic simplification",
            "constant propagation",
            "common subexpression elimination",
            "dead code elimination",
            "loop unrolling",
            "loop-invariant hoisting",
            "loop fusion",
            "dead function elimination",
        ]
    );
}
