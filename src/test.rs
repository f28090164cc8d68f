use super::*;
use crate::diagnostics::Category;

fn compile_default(source: &str) -> Compilation {
    compile(source, &CompileOptions::default()).unwrap()
}

#[test]
fn test_clean_program_is_optimized() {
    let compilation = compile_default("int x = 2 + 3;\nprint(x);");
    assert!(!compilation.has_errors());
    assert_eq!(compilation.diagnostics().count(), 0);

    let analysis = &compilation.analysis;
    assert!(!analysis.applied.is_empty());
    assert!(analysis.applied[0].starts_with("Constant folding: 2 + 3 = 5"));
    assert_eq!(regen::regenerate(&analysis.ast), "int x = 5;\nprint(5);\n");

    // 语法分析的结果保持不变
    assert_eq!(regen::regenerate(&compilation.parsed), "int x = (2 + 3);\nprint(x);\n");
}

#[test]
fn test_optimizer_can_be_disabled() {
    let options = CompileOptions {
        optimize: false,
        ..CompileOptions::default()
    };
    let compilation = compile("int x = 2 + 3;\nprint(x);", &options).unwrap();
    assert!(compilation.analysis.applied.is_empty());
    assert_eq!(
        regen::regenerate(&compilation.analysis.ast),
        "int x = (2 + 3);\nprint(x);\n"
    );
}

#[test]
fn test_semantic_errors_skip_optimization() {
    let compilation = compile_default("int x = 2 + 3;\nprint(y);");
    assert!(compilation.has_errors());
    assert!(compilation.syntax.is_empty());
    assert_eq!(
        compilation.analysis.errors.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        vec!["[DECLARATION] Variable 'y' not declared"]
    );
    assert!(compilation.analysis.applied.is_empty());
    assert_eq!(
        regen::regenerate(&compilation.analysis.ast),
        regen::regenerate(&compilation.parsed)
    );
}

#[test]
fn test_syntax_errors_do_not_stop_analysis() {
    let compilation = compile_default("print(1;\nint y = 2;\nprint(y);");
    assert!(!compilation.syntax.is_empty());
    assert!(compilation.has_errors());
    assert!(compilation.declarations.lookup("y").unwrap().is_some());
    assert_eq!(
        compilation.diagnostics().next().map(|d| d.category()),
        Some(Category::Syntax)
    );
}

#[test]
fn test_invalid_tokens_are_reported_first() {
    let compilation = compile_default("int x = 1;\nprint(x);\n?");
    assert_eq!(compilation.lexical.len(), 1);
    assert!(!compilation.lexical[0].is_error());
    assert_eq!(
        compilation.diagnostics().next().map(|d| d.category()),
        Some(Category::Lexical)
    );
}

#[test]
fn test_small_budget_spills_declarations() {
    let options = CompileOptions {
        memory_budget: 20,
        ..CompileOptions::default()
    };
    let compilation = compile(
        "int a = 1;\nint b = 2;\nint c = 3;\nprint(a, b, c);",
        &options,
    )
    .unwrap();

    let stats = compilation.declarations.stats().unwrap();
    assert_eq!(stats.total_count, 3);
    assert!(stats.secondary_count > 0);
    assert!(stats.resident_bytes <= stats.budget);

    // 换出到磁盘的声明依然参与语义分析
    assert!(compilation.analysis.errors.is_empty());
    for name in ["a", "b", "c"] {
        assert!(compilation.analysis.symbols.find(name).is_some());
    }
}

#[test]
fn test_unused_function_removed_from_output() {
    let compilation = compile_default(
        "int helper() { return 1; }\nint main() { return 0; }\nint r = main();\nprint(r);",
    );
    assert!(!compilation.has_errors());
    let output = regen::regenerate(&compilation.analysis.ast);
    assert!(!output.contains("helper"));
    assert!(output.contains("int main()"));
    assert!(
        compilation
            .analysis
            .applied
            .iter()
            .any(|a| a == "Dead function: removed 'helper' declared at line 1")
    );
}

#[test]
fn test_huge_loop_bound_compiles() {
    let compilation =
        compile_default("int i = 0;\nfor i; i <= 9223372036854775807; i++ {\n    print(i);\n}\n");
    assert!(!compilation.has_errors());
    assert!(regen::regenerate(&compilation.analysis.ast).contains("for i; (i <= 9223372036854775807); i++ {"));
}
