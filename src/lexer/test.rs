// 导入父模块（也就是 lexer 模块）的所有内容
use super::*;
use crate::diagnostics::Category;

/// 一个辅助函数，用于简化测试。
/// 只返回 (种类, 文本) 对，大多数测试只关心 Token 的类型和顺序。
fn lex_pairs(source: &str) -> Vec<(TokenKind, String)> {
    lex(source).into_iter().map(|t| (t.kind, t.text)).collect()
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).into_iter().map(|t| t.kind).collect()
}

// --- 成功案例 (Happy Path) ---

#[test]
fn test_simple_assignment() {
    let tokens = lex("x = 2 + 3;");
    let shown: Vec<_> = tokens
        .iter()
        .map(|t| (t.kind.category(), t.text.as_str()))
        .collect();
    assert_eq!(
        shown,
        vec![
            ("Identifier", "x"),
            ("Assignment", "="),
            ("Number", "2"),
            ("Arithmetic", "+"),
            ("Number", "3"),
            ("Semicolon", ";"),
        ]
    );
    assert!(tokens.iter().all(|t| t.valid));
}

#[test]
fn test_keywords_and_identifiers() {
    let source = "int main_function = 10; iffy if";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Keyword(Keyword::Int),
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::Keyword(Keyword::If),
        ]
    );
}

#[test]
fn test_is_not_is_one_keyword() {
    assert_eq!(
        kinds("a is not b is c is nothing"),
        vec![
            TokenKind::Identifier,
            TokenKind::Keyword(Keyword::IsNot),
            TokenKind::Identifier,
            TokenKind::Keyword(Keyword::Is),
            TokenKind::Identifier,
            TokenKind::Keyword(Keyword::Is),
            TokenKind::Identifier,
        ]
    );
    assert_eq!(lex("x is not y")[1].text, "is not");
}

#[test]
fn test_all_operators() {
    let source = "+= -= *= /= == != <= >= < > ++ -- ** = + - * / % && || !";
    let expected = vec![
        (TokenKind::CompoundAssign, "+="),
        (TokenKind::CompoundAssign, "-="),
        (TokenKind::CompoundAssign, "*="),
        (TokenKind::CompoundAssign, "/="),
        (TokenKind::Relational, "=="),
        (TokenKind::Relational, "!="),
        (TokenKind::Relational, "<="),
        (TokenKind::Relational, ">="),
        (TokenKind::Relational, "<"),
        (TokenKind::Relational, ">"),
        (TokenKind::Increment, "++"),
        (TokenKind::Increment, "--"),
        (TokenKind::Increment, "**"),
        (TokenKind::Assign, "="),
        (TokenKind::Arithmetic, "+"),
        (TokenKind::Arithmetic, "-"),
        (TokenKind::Arithmetic, "*"),
        (TokenKind::Arithmetic, "/"),
        (TokenKind::Arithmetic, "%"),
        (TokenKind::Logical, "&&"),
        (TokenKind::Logical, "||"),
        (TokenKind::Logical, "!"),
    ];
    let expected: Vec<_> = expected.into_iter().map(|(k, s)| (k, s.to_string())).collect();
    assert_eq!(lex_pairs(source), expected);
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("{ } ( ) [ ] : , ; ."),
        vec![
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Dot,
        ]
    );
}

#[test]
fn test_numbers_and_strings() {
    let pairs = lex_pairs(r#"3.14 42 .5 "hi \"there\"" -7"#);
    assert_eq!(
        pairs,
        vec![
            (TokenKind::Number, "3.14".to_string()),
            (TokenKind::Number, "42".to_string()),
            (TokenKind::Number, ".5".to_string()),
            (TokenKind::Str, r#""hi \"there\"""#.to_string()),
            (TokenKind::Arithmetic, "-".to_string()),
            (TokenKind::Number, "7".to_string()),
        ]
    );
}

#[test]
fn test_comments_and_whitespace_are_skipped() {
    let source = r#"
        // 这是一个单行注释
        int /// 这是一个
                块注释 /// main;
    "#;
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Keyword(Keyword::Int),
            TokenKind::Identifier,
            TokenKind::Semicolon,
        ]
    );
}

#[test]
fn test_unterminated_block_comment_acts_as_line_comment() {
    let source = "int a; /// never closed\nint b;";
    assert_eq!(
        lex_pairs(source).into_iter().map(|(_, s)| s).collect::<Vec<_>>(),
        vec!["int", "a", ";", "int", "b", ";"]
    );
}

#[test]
fn test_line_and_column_tracking() {
    let source = "int a;\n  a = 1;\n/// x\ny ///\nb";
    let tokens = lex(source);
    let positions: Vec<_> = tokens.iter().map(|t| (t.text.as_str(), t.line, t.column)).collect();
    assert_eq!(
        positions,
        vec![
            ("int", 1, 1),
            ("a", 1, 5),
            (";", 1, 6),
            ("a", 2, 3),
            ("=", 2, 5),
            ("1", 2, 7),
            (";", 2, 8),
            ("b", 5, 1),
        ]
    );
}

// --- 失败案例 (Sad Path) ---
// 无效输入不会让词法分析失败，而是产生被标记为无效的 Token。

#[test]
fn test_unrecognized_run_becomes_one_token() {
    let tokens = lex("int a = #$@ 1;");
    let bad: Vec<_> = tokens.iter().filter(|t| !t.valid).collect();
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].kind, TokenKind::Unrecognized);
    assert_eq!(bad[0].text, "#$@");
    assert_eq!((bad[0].line, bad[0].column), (1, 9));
    // 之后的 Token 照常产生
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Semicolon));
}

#[test]
fn test_invalid_numbers() {
    let tokens = lex("12abc 1.2.3 7");
    let shown: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str(), t.valid)).collect();
    assert_eq!(
        shown,
        vec![
            (TokenKind::InvalidNumber, "12abc", false),
            (TokenKind::InvalidNumber, "1.2.3", false),
            (TokenKind::Number, "7", true),
        ]
    );
}

#[test]
fn test_invalid_token_diagnostics() {
    let tokens = lex("x = 9lives;\ny = ?;");
    let diagnostics = invalid_token_diagnostics(&tokens);
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.category() == Category::Lexical && !d.is_error()));
    assert_eq!(diagnostics[0].to_string(), "invalid token at line 1, column 5: '9lives'");
    assert_eq!(diagnostics[1].to_string(), "invalid token at line 2, column 5: '?;'");
}
