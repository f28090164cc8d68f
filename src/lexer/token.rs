use crate::utils::{Position, Span};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};

/// 主体 Token 定义：种类、原始文本、位置以及有效性标记。
///
/// 无效的 Token（`InvalidNumber` 与 `Unrecognized`）同样会被输出，
/// `valid` 只是提示信息，从不导致词法分析失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub valid: bool,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position, span: Span) -> Self {
        Self {
            valid: kind.is_valid(),
            kind,
            text: text.into(),
            line: position.line,
            column: position.column,
            span,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// 检查 Token 是否为给定关键字。
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// 检查 Token 的种类与文本是否同时匹配，例如 `(Arithmetic, "+")`。
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "line {} col {}: {}({}){}",
            self.line,
            self.column,
            self.kind.category(),
            self.text,
            if self.valid { "" } else { " [invalid]" }
        )
    }
}

/// 语言中所有可能的词法类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// 保留字。
    Keyword(Keyword),
    Number,
    /// 形如 `12abc` 或 `1.2.3` 的数字。
    InvalidNumber,
    Str,
    /// `+= -= *= /=`
    CompoundAssign,
    /// `== != <= >= < >`
    Relational,
    /// `++ -- **`
    Increment,
    Assign,
    /// `+ - * / %`
    Arithmetic,
    /// `&& || !`
    Logical,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semicolon,
    Dot,
    Identifier,
    /// 兜底类别：任何规则都无法匹配的输入。
    Unrecognized,
}

impl TokenKind {
    pub fn is_valid(&self) -> bool {
        !matches!(self, TokenKind::InvalidNumber | TokenKind::Unrecognized)
    }

    /// 展示用的类别名。
    pub fn category(&self) -> &'static str {
        match self {
            TokenKind::Keyword(_) => "Reserved",
            TokenKind::Number => "Number",
            TokenKind::InvalidNumber => "InvalidNumber",
            TokenKind::Str => "String",
            TokenKind::CompoundAssign => "CompoundAssignment",
            TokenKind::Relational => "Relational",
            TokenKind::Increment => "Incrementer",
            TokenKind::Assign => "Assignment",
            TokenKind::Arithmetic => "Arithmetic",
            TokenKind::Logical => "Logical",
            TokenKind::LBrace => "LBrace",
            TokenKind::RBrace => "RBrace",
            TokenKind::LParen => "LParen",
            TokenKind::RParen => "RParen",
            TokenKind::LBracket => "LBracket",
            TokenKind::RBracket => "RBracket",
            TokenKind::Colon => "Colon",
            TokenKind::Comma => "Comma",
            TokenKind::Semicolon => "Semicolon",
            TokenKind::Dot => "Dot",
            TokenKind::Identifier => "Identifier",
            TokenKind::Unrecognized => "Unrecognized",
        }
    }
}

/// 保留字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // 控制流
    If,
    Else,
    For,
    While,
    Return,
    Try,
    Catch,
    Throw,
    In,

    // 修饰符
    Const,
    Readonly,
    Global,
    Local,
    Shared,

    // 声明
    Model,
    Template,
    Extends,
    Override,
    Import,
    From,
    Function,

    // 运算符关键字
    IsNot,
    Is,
    Not,
    And,
    Or,
    NotUpper,
    AndUpper,
    OrUpper,

    // 内置类型
    Void,
    Int,
    Float,
    Char,
    Bool,
    String,
    MapInt,
    MapString,

    // 布尔字面量
    True,
    False,

    // 内置 IO 函数
    Print,
    Input,
    Println,
    ReadLine,
    ReadInt,
    ReadFloat,
    Write,
    WriteLine,
}

impl Keyword {
    const ALL: [Keyword; 47] = [
        Keyword::If,
        Keyword::Else,
        Keyword::For,
        Keyword::While,
        Keyword::Return,
        Keyword::Try,
        Keyword::Catch,
        Keyword::Throw,
        Keyword::In,
        Keyword::Const,
        Keyword::Readonly,
        Keyword::Global,
        Keyword::Local,
        Keyword::Shared,
        Keyword::Model,
        Keyword::Template,
        Keyword::Extends,
        Keyword::Override,
        Keyword::Import,
        Keyword::From,
        Keyword::Function,
        Keyword::IsNot,
        Keyword::Is,
        Keyword::Not,
        Keyword::And,
        Keyword::Or,
        Keyword::NotUpper,
        Keyword::AndUpper,
        Keyword::OrUpper,
        Keyword::Void,
        Keyword::Int,
        Keyword::Float,
        Keyword::Char,
        Keyword::Bool,
        Keyword::String,
        Keyword::MapInt,
        Keyword::MapString,
        Keyword::True,
        Keyword::False,
        Keyword::Print,
        Keyword::Input,
        Keyword::Println,
        Keyword::ReadLine,
        Keyword::ReadInt,
        Keyword::ReadFloat,
        Keyword::Write,
        Keyword::WriteLine,
    ];

    /// 把一个完整的单词映射为保留字；普通标识符返回 `None`。
    pub fn from_word(word: &str) -> Option<Keyword> {
        Self::ALL.iter().copied().find(|k| k.as_str() == word)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Return => "return",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Throw => "throw",
            Keyword::In => "in",
            Keyword::Const => "const",
            Keyword::Readonly => "readonly",
            Keyword::Global => "global",
            Keyword::Local => "local",
            Keyword::Shared => "shared",
            Keyword::Model => "model",
            Keyword::Template => "template",
            Keyword::Extends => "extends",
            Keyword::Override => "override",
            Keyword::Import => "import",
            Keyword::From => "from",
            Keyword::Function => "function",
            Keyword::IsNot => "is not",
            Keyword::Is => "is",
            Keyword::Not => "not",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::NotUpper => "NOT",
            Keyword::AndUpper => "AND",
            Keyword::OrUpper => "OR",
            Keyword::Void => "void",
            Keyword::Int => "int",
            Keyword::Float => "float",
            Keyword::Char => "char",
            Keyword::Bool => "bool",
            Keyword::String => "string",
            Keyword::MapInt => "mapInt",
            Keyword::MapString => "mapString",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Print => "print",
            Keyword::Input => "input",
            Keyword::Println => "println",
            Keyword::ReadLine => "readLine",
            Keyword::ReadInt => "readInt",
            Keyword::ReadFloat => "readFloat",
            Keyword::Write => "write",
            Keyword::WriteLine => "writeLine",
        }
    }

    /// 基本类型关键字（可以开始一个声明）。
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            Keyword::Void
                | Keyword::Int
                | Keyword::Float
                | Keyword::Char
                | Keyword::Bool
                | Keyword::String
        )
    }

    pub fn is_map_type(&self) -> bool {
        matches!(self, Keyword::MapInt | Keyword::MapString)
    }

    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Keyword::Const | Keyword::Readonly | Keyword::Global | Keyword::Local | Keyword::Shared
        )
    }

    /// 内置 IO 函数集合。
    pub fn is_io_builtin(&self) -> bool {
        matches!(
            self,
            Keyword::Print
                | Keyword::Input
                | Keyword::Println
                | Keyword::ReadLine
                | Keyword::ReadInt
                | Keyword::ReadFloat
                | Keyword::Write
                | Keyword::WriteLine
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}
