use super::ast::{Ast, NodeId, NodeKind};
use super::*; // 导入父模块（parser）的所有公共项，主要是 `parse` 函数
use crate::lexer;
use crate::symtab::SymbolCategory;

/// 辅助函数：执行词法和语法分析，返回 AST、诊断文本与声明表。
fn parse_source(source: &str) -> (Ast, Vec<String>, SymbolTable) {
    let tokens = lexer::lex(source);
    let mut table = SymbolTable::new().unwrap();
    let output = parse(&tokens, &mut table).unwrap();
    let messages = output.diagnostics.iter().map(|d| d.to_string()).collect();
    (output.ast, messages, table)
}

/// 辅助函数，用于测试成功解析的场景：出现任何语法错误都会 panic。
fn parse_source_ok(source: &str) -> (Ast, SymbolTable) {
    let (ast, errors, table) = parse_source(source);
    assert!(errors.is_empty(), "Parser failed unexpectedly for source: {}\n{:?}", source, errors);
    (ast, table)
}

/// 顶层语句列表。
fn top(ast: &Ast) -> Vec<NodeId> {
    ast.statements(ast.root()).to_vec()
}

// --- 成功路径测试 (Happy Path) ---

#[test]
fn test_variable_declaration_registers_global_symbol() {
    let (ast, table) = parse_source_ok("int x = 5;");
    let stmts = top(&ast);
    assert_eq!(stmts.len(), 1);

    let decl = stmts[0];
    assert_eq!(ast.kind(decl), NodeKind::VarDecl);
    assert_eq!(ast.value(decl), Some("x"));
    let (modifiers, ty, init) = ast.var_decl_parts(decl).unwrap();
    assert!(modifiers.is_empty());
    assert_eq!(ty, "int");
    let init = init.expect("declaration should have an initializer");
    assert_eq!(ast.kind(init), NodeKind::Number);
    assert_eq!(ast.value(init), Some("5"));

    let records = table.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identifier, "x");
    assert_eq!(records[0].scope, "global");
    assert_eq!(records[0].category, SymbolCategory::Variable);
    assert!(records[0].initialized);
}

#[test]
fn test_duplicate_declaration_keeps_one_record() {
    let (_ast, table) = parse_source_ok("int x;\nint x;");
    let records = table.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].line, 2);
}

#[test]
fn test_modifiers_and_composite_types() {
    let (ast, table) = parse_source_ok("const global mapInt<string> names; int[] xs = {1, 2};");
    let stmts = top(&ast);
    let (modifiers, ty, init) = ast.var_decl_parts(stmts[0]).unwrap();
    assert_eq!(modifiers, vec!["const", "global"]);
    assert_eq!(ty, "mapInt<string>");
    assert!(init.is_none());

    let (_, ty, init) = ast.var_decl_parts(stmts[1]).unwrap();
    assert_eq!(ty, "int[]");
    let list = init.unwrap();
    assert_eq!(ast.kind(list), NodeKind::List);
    assert_eq!(ast.children(list).len(), 2);
    assert_eq!(table.list().unwrap().len(), 2);
}

#[test]
fn test_function_declaration_with_signature() {
    let source = r#"
        int add(int a, float b) {
            return a + b;
        }
    "#;
    let (ast, table) = parse_source_ok(source);
    let func = top(&ast)[0];
    assert_eq!(ast.kind(func), NodeKind::FunctionDecl);
    assert_eq!(ast.value(func), Some("add"));

    let return_type = ast.child(func, 0).unwrap();
    assert_eq!(ast.kind(return_type), NodeKind::ReturnType);
    assert_eq!(ast.value(return_type), Some("int"));
    let params = ast.child(func, 1).unwrap();
    assert_eq!(ast.children(params).len(), 2);
    let body = ast.statements(func);
    assert_eq!(body.len(), 1);
    assert_eq!(ast.kind(body[0]), NodeKind::Return);

    let record = table.lookup("add").unwrap().unwrap();
    assert_eq!(record.category, SymbolCategory::Function);
    assert_eq!(record.return_type.as_deref(), Some("int"));
    let params = record.params.unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[1].name, "b");
    assert_eq!(params[1].ty, "float");
}

#[test]
fn test_local_variables_are_not_registered() {
    let source = "void f() { int local_one = 1; global int shared_one = 2; }";
    let (_ast, table) = parse_source_ok(source);
    assert!(table.lookup("local_one").unwrap().is_none());
    assert!(table.lookup("shared_one").unwrap().is_some());
    assert!(table.lookup("f").unwrap().is_some());
}

#[test]
fn test_function_keyword_declares_void_function() {
    let (ast, table) = parse_source_ok("function greet(string name) { print(name); }");
    let func = top(&ast)[0];
    assert_eq!(ast.kind(func), NodeKind::FunctionDecl);
    assert_eq!(ast.value(ast.child(func, 0).unwrap()), Some("void"));
    assert_eq!(table.lookup("greet").unwrap().unwrap().ty, "void");
}

#[test]
fn test_model_with_extends_and_override() {
    let source = r#"
        model Dog extends Animal {
            string name;
            override void speak() { println("woof"); }
            int legs() { return 4; }
        }
    "#;
    let (ast, table) = parse_source_ok(source);
    let model = top(&ast)[0];
    assert_eq!(ast.kind(model), NodeKind::Model);
    assert_eq!(ast.value(model), Some("Dog"));

    let extends = ast.child(model, 0).unwrap();
    assert_eq!(ast.kind(extends), NodeKind::Extends);
    assert_eq!(ast.value(extends), Some("Animal"));

    let members = ast.statements(model);
    let kinds: Vec<_> = members.iter().map(|&m| ast.kind(m)).collect();
    assert_eq!(kinds, vec![NodeKind::VarDecl, NodeKind::OverrideDecl, NodeKind::FunctionDecl]);

    // 成员函数不进入声明表
    assert_eq!(table.lookup("Dog").unwrap().unwrap().category, SymbolCategory::Model);
    assert!(table.lookup("speak").unwrap().is_none());
    assert!(table.lookup("legs").unwrap().is_none());
}

#[test]
fn test_template_signatures() {
    let source = "template Shape { float area(); string describe(int depth); }";
    let (ast, table) = parse_source_ok(source);
    let template = top(&ast)[0];
    assert_eq!(ast.kind(template), NodeKind::Template);
    let signatures = ast.children(template);
    assert_eq!(signatures.len(), 2);
    assert_eq!(ast.value(signatures[1]), Some("describe"));
    assert_eq!(table.lookup("Shape").unwrap().unwrap().category, SymbolCategory::Template);
}

#[test]
fn test_if_else_if_else_chain() {
    let source = r#"
        int x = 1;
        if (x > 1) { print("a"); } else if x == 1 { print("b"); } else { print("c"); }
    "#;
    let (ast, _) = parse_source_ok(source);
    let if_node = top(&ast)[1];
    assert_eq!(ast.kind(if_node), NodeKind::If);
    let children = ast.children(if_node);
    assert_eq!(ast.kind(children[0]), NodeKind::RelationalOp);
    assert_eq!(ast.kind(children[1]), NodeKind::Block);
    let nested = children[2];
    assert_eq!(ast.kind(nested), NodeKind::If);
    assert_eq!(ast.kind(ast.child(nested, 2).unwrap()), NodeKind::Else);
}

#[test]
fn test_for_range_and_for_each() {
    let source = r#"
        for i; i < 3; i++ { print(i); }
        for (int v in values) { print(v); }
    "#;
    let (ast, _) = parse_source_ok(source);
    let stmts = top(&ast);

    let range = stmts[0];
    assert_eq!(ast.kind(range), NodeKind::ForRange);
    assert_eq!(ast.value(range), Some("i"));
    let kinds: Vec<_> = ast.children(range).iter().map(|&c| ast.kind(c)).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Variable,
            NodeKind::RelationalOp,
            NodeKind::Variable,
            NodeKind::Increment,
            NodeKind::Block
        ]
    );

    let each = stmts[1];
    assert_eq!(ast.kind(each), NodeKind::ForEach);
    assert_eq!(ast.value(ast.child(each, 0).unwrap()), Some("int"));
    assert_eq!(ast.value(ast.child(each, 1).unwrap()), Some("v"));
}

#[test]
fn test_try_catch_throw_and_imports() {
    let source = r#"
        import math;
        from io import reader, writer;
        try { throw failure; } catch (error e) { println(e); }
    "#;
    let (ast, _) = parse_source_ok(source);
    let stmts = top(&ast);
    assert_eq!(ast.kind(stmts[0]), NodeKind::Import);
    assert_eq!(ast.value(stmts[0]), Some("math"));

    assert_eq!(ast.kind(stmts[1]), NodeKind::FromImport);
    let deps = ast.child(stmts[1], 0).unwrap();
    assert_eq!(ast.children(deps).len(), 2);

    let try_catch = stmts[2];
    assert_eq!(ast.kind(try_catch), NodeKind::TryCatch);
    let catch = ast.child(try_catch, 1).unwrap();
    assert_eq!(ast.kind(catch), NodeKind::Catch);
    assert_eq!(ast.value(catch), Some("e"));
}

#[test]
fn test_expression_precedence() {
    let (ast, _) = parse_source_ok("x = 1 + 2 * 3 > 4 and not done;");
    let assignment = top(&ast)[0];
    assert_eq!(ast.assignment_parts(assignment), Some(("x", "=")));

    let logical = ast.child(assignment, 0).unwrap();
    assert_eq!(ast.kind(logical), NodeKind::LogicalOp);
    assert_eq!(ast.value(logical), Some("and"));

    let relational = ast.child(logical, 0).unwrap();
    assert_eq!(ast.value(relational), Some(">"));
    let sum = ast.child(relational, 0).unwrap();
    assert_eq!(ast.value(sum), Some("+"));
    assert_eq!(ast.value(ast.child(sum, 1).unwrap()), Some("*"));

    let negation = ast.child(logical, 1).unwrap();
    assert_eq!(ast.value(negation), Some("not"));
    assert_eq!(ast.children(negation).len(), 1);
}

#[test]
fn test_identifier_statements() {
    let source = "count++; total += 2; run(1, 2); x = items[0]; y = z--;";
    let (ast, _) = parse_source_ok(source);
    let kinds: Vec<_> = top(&ast).iter().map(|&s| ast.kind(s)).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::IncrementStmt,
            NodeKind::Assignment,
            NodeKind::Call,
            NodeKind::Assignment,
            NodeKind::Assignment
        ]
    );
    let stmts = top(&ast);
    assert_eq!(ast.increment_op(stmts[0]), Some("++"));
    assert_eq!(ast.assignment_parts(stmts[1]), Some(("total", "+=")));
    let index = ast.child(stmts[3], 0).unwrap();
    assert_eq!(ast.kind(index), NodeKind::IndexAccess);
    let postfix = ast.child(stmts[4], 0).unwrap();
    assert_eq!(ast.kind(postfix), NodeKind::PostfixIncrement);
    assert_eq!(ast.increment_op(postfix), Some("--"));
}

#[test]
fn test_user_type_declaration() {
    let (ast, table) = parse_source_ok("Point origin = {x: 0, y: 0};");
    let decl = top(&ast)[0];
    assert_eq!(ast.kind(decl), NodeKind::VarDecl);
    let (_, ty, init) = ast.var_decl_parts(decl).unwrap();
    assert_eq!(ty, "Point");
    let list = init.unwrap();
    assert_eq!(ast.kind(ast.children(list)[0]), NodeKind::KeyValue);
    assert_eq!(table.lookup("origin").unwrap().unwrap().ty, "Point");
}

#[test]
fn test_semicolons_are_optional() {
    let (ast, _) = parse_source_ok("int a = 1\nint b = 2\nprint(a)");
    assert_eq!(top(&ast).len(), 3);
}

#[test]
fn test_anonymous_function_expression() {
    let (ast, _) = parse_source_ok("handler = function (int code) { print(code); };");
    let assignment = top(&ast)[0];
    let func = ast.child(assignment, 0).unwrap();
    assert_eq!(ast.kind(func), NodeKind::AnonymousFunction);
    assert_eq!(ast.statements(func).len(), 1);
}

// --- 失败路径测试 (Sad Path) ---

#[test]
fn test_missing_paren_reports_positioned_error() {
    let (_ast, errors, _) = parse_source("print(1;\nint y = 2;");
    assert!(!errors.is_empty());
    assert_eq!(errors[0], "syntax error at line 1, column 8: expected ')' but found ';'");
}

#[test]
fn test_multiple_errors_are_collected() {
    let source = "int = 5;\n) \nwhile (x < ) { }\nint ok = 1;";
    let (ast, errors, table) = parse_source(source);
    assert!(errors.len() >= 3, "expected several errors, got {:?}", errors);
    assert!(errors.iter().all(|e| e.starts_with("syntax error at line ")));
    // 解析在出错后继续，后面的声明依然被识别
    assert!(table.lookup("ok").unwrap().is_some());
    assert_eq!(ast.kind(ast.root()), NodeKind::Program);
}

#[test]
fn test_error_at_end_of_input_points_past_last_token() {
    let (_ast, errors, _) = parse_source("while x {");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0], "syntax error at line 1, column 10: expected '}' but found 'EOF'");
}

#[test]
fn test_parser_terminates_on_garbage() {
    let (ast, errors, _) = parse_source("} } ] ) @@ ; else");
    assert!(!errors.is_empty());
    assert!(top(&ast).is_empty());
}

#[test]
fn test_ast_json_serialization() {
    let (ast, _) = parse_source_ok("int x = 5;");
    let json: serde_json::Value = serde_json::from_str(&ast.to_json().unwrap()).unwrap();
    assert_eq!(json["tag"], "Program");
    assert_eq!(json["children"][0]["tag"], "VarDecl");
    assert_eq!(json["children"][0]["value"], "x");
    assert_eq!(json["children"][0]["children"][0]["value"], "int");
}
