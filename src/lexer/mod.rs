// 导入logos分词库
use logos::{Lexer, Logos, Skip};

use crate::diagnostics::{Diagnostic, Label, codes};
use crate::utils::{LineIndex, Span};

pub mod token;
pub use token::{Keyword, Token, TokenKind};

// 声明单元测试模块
#[cfg(test)]
mod test;

// logos 解析时需要使用的错误类型
#[derive(Debug, Default, Clone, PartialEq)]
enum LexingError {
    #[default]
    InvalidToken,
}

/// logos 内部使用的词素，之后再映射为公开的 `TokenKind`。
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(error = LexingError)]
// 跳过空白
#[logos(skip r"[ \t\r\n\f]+")]
// 跳过单行注释（`///` 交给块注释处理）
#[logos(skip r"//([^/\n][^\n]*)?")]
enum RawToken {
    // 块注释 `/// ... ///`，在回调里直接跳过
    #[token("///", block_comment)]
    BlockComment,

    // 单词：保留字与标识符共用一条规则，映射阶段再区分
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,

    // 数字字面量（不带符号，符号是一元运算符）
    #[regex(r"[0-9]+\.[0-9]+|[0-9]+|\.[0-9]+")]
    Number,

    // 数字后面紧跟标识符字符，或者出现多个小数点
    #[regex(r"[0-9]+[a-zA-Z_][a-zA-Z0-9_]*")]
    #[regex(r"[0-9]+\.[0-9]+(\.[0-9]+)+")]
    InvalidNumber,

    // 字符串字面量，保留引号
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    CompoundAssign,

    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    Relational,

    #[token("++")]
    #[token("--")]
    #[token("**")]
    Increment,

    #[token("=")]
    Assign,

    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    Arithmetic,

    #[token("&&")]
    #[token("||")]
    #[token("!")]
    Logical,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
}

/// 块注释的回调：跳到下一个 `///` 之后。
/// 没有闭合时退化为单行注释，只跳到行尾。
fn block_comment(lex: &mut Lexer<RawToken>) -> Skip {
    let rest = lex.remainder();
    match rest.find("///") {
        Some(end) => lex.bump(end + 3),
        None => lex.bump(rest.find('\n').unwrap_or(rest.len())),
    }
    Skip
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl RawToken {
    fn kind(self, text: &str) -> TokenKind {
        match self {
            RawToken::Word => match Keyword::from_word(text) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier,
            },
            RawToken::Number => TokenKind::Number,
            RawToken::InvalidNumber => TokenKind::InvalidNumber,
            RawToken::Str => TokenKind::Str,
            RawToken::CompoundAssign => TokenKind::CompoundAssign,
            RawToken::Relational => TokenKind::Relational,
            RawToken::Increment => TokenKind::Increment,
            RawToken::Assign => TokenKind::Assign,
            RawToken::Arithmetic => TokenKind::Arithmetic,
            RawToken::Logical => TokenKind::Logical,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Dot => TokenKind::Dot,
            // 回调总是返回 Skip，这个分支不会真正出现
            RawToken::BlockComment => TokenKind::Unrecognized,
        }
    }
}

/// 对源代码进行词法分析。
///
/// 这是一个全函数：无法识别的输入会变成 `Unrecognized` Token，而不是错误。
/// 每个 Token 的行列号由字节偏移经过行首索引换算得到，所以块注释里的换行同样计数。
pub fn lex(source: &str) -> Vec<Token> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let start = lexer.span().start;
        let kind = match result {
            Ok(raw) => {
                let mut kind = raw.kind(lexer.slice());
                // `is not` 作为一个整体的保留字
                if kind == TokenKind::Keyword(Keyword::Is) {
                    let rest = lexer.remainder();
                    let merged = rest
                        .strip_prefix(" not")
                        .is_some_and(|after| !after.starts_with(is_word_char));
                    if merged {
                        lexer.bump(" not".len());
                        kind = TokenKind::Keyword(Keyword::IsNot);
                    }
                }
                kind
            }
            Err(_) => {
                // 把从出错位置开始的整段非空白字符吞成一个 Token
                let rest = lexer.remainder();
                let run = rest.find(char::is_whitespace).unwrap_or(rest.len());
                lexer.bump(run);
                TokenKind::Unrecognized
            }
        };
        let end = lexer.span().end;
        let token = Token::new(kind, &source[start..end], index.position(start), Span::new(start, end));
        log::trace!("token {}", token);
        tokens.push(token);
    }

    log::debug!("lexed {} tokens", tokens.len());
    tokens
}

/// 把无效 Token 转换成词法警告，仅供展示。
pub fn invalid_token_diagnostics(tokens: &[Token]) -> Vec<Diagnostic> {
    tokens
        .iter()
        .filter(|token| !token.valid)
        .map(|token| {
            let code = match token.kind {
                TokenKind::InvalidNumber => &codes::E0001_INVALID_NUMBER,
                _ => &codes::E0000_UNRECOGNIZED_TOKEN,
            };
            Diagnostic::new(code, Label::new(token.span, "this token is not valid"))
                .with_position(token.position())
                .with_dynamic_message(format!("'{}'", token.text))
                .with_note(code.explanation)
        })
        .collect()
}
