// src/diagnostics/codes.rs

use crate::diagnostics::{Category, DiagnosticLevel};

/// Represents a specific error code with its associated information.
/// This struct serves as the single source of truth for all compiler diagnostics.
#[derive(Debug, Clone)]
pub struct ErrorCode {
    pub code: &'static str,
    pub level: DiagnosticLevel,
    pub category: Category,
    pub message: &'static str,
    pub explanation: &'static str,
}

/*
E00xx: 词法分析 (Lexical Analysis)，只作提示，不会中断编译。

E01xx: 语法分析 (Parsing / Syntax) 错误。

E02xx: 语义分析 (Semantic Analysis) 错误。
    E020x 类型, E021x 声明, E022x 初始化, E023x 函数。

W03xx: 警告。
*/
// --- E00xx: Lexical Analysis ---

pub const E0000_UNRECOGNIZED_TOKEN: ErrorCode = ErrorCode {
    code: "E0000",
    level: DiagnosticLevel::Warning,
    category: Category::Lexical,
    message: "Unrecognized token",
    explanation: "The input at this position matches no token rule of the language. \
                  The lexer keeps it as a single invalid token and continues scanning.",
};

pub const E0001_INVALID_NUMBER: ErrorCode = ErrorCode {
    code: "E0001",
    level: DiagnosticLevel::Warning,
    category: Category::Lexical,
    message: "Invalid number literal",
    explanation: "A number literal is immediately followed by identifier characters (e.g. `12abc`) \
                  or contains more than one decimal point (e.g. `1.2.3`).",
};

// --- E01xx: Syntax Analysis (Parsing) Errors ---

pub const E0100_SYNTAX_ERROR: ErrorCode = ErrorCode {
    code: "E0100",
    level: DiagnosticLevel::Error,
    category: Category::Syntax,
    message: "Syntax error",
    explanation: "The arrangement of tokens does not match any known grammar rule. \
                  Check for mismatched brackets or incorrect statement structures.",
};

pub const E0101_EXPECTED_TOKEN: ErrorCode = ErrorCode {
    code: "E0101",
    level: DiagnosticLevel::Error,
    category: Category::Syntax,
    message: "Expected a different token",
    explanation: "The grammar requires a specific token at this position, such as a closing \
                  parenthesis after a condition or an identifier after a type.",
};

pub const E0102_EXPECTED_EXPRESSION: ErrorCode = ErrorCode {
    code: "E0102",
    level: DiagnosticLevel::Error,
    category: Category::Syntax,
    message: "Expected an expression",
    explanation: "An expression (literal, identifier, call, parenthesized expression or list) \
                  was required here.",
};

pub const E0103_UNEXPECTED_END: ErrorCode = ErrorCode {
    code: "E0103",
    level: DiagnosticLevel::Error,
    category: Category::Syntax,
    message: "Unexpected end of input",
    explanation: "The source ended while a construct was still open, usually a missing `}` or `)`.",
};

// --- E020x: Type Errors ---

pub const E0200_TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E0200",
    level: DiagnosticLevel::Error,
    category: Category::Type,
    message: "Type mismatch",
    explanation: "The type of an expression is not compatible with the type expected by the context. \
                  `int` and `float` are interchangeable, and so are `bool` and `int`.",
};

pub const E0201_INVALID_OPERANDS: ErrorCode = ErrorCode {
    code: "E0201",
    level: DiagnosticLevel::Error,
    category: Category::Type,
    message: "Invalid operand types",
    explanation: "Arithmetic and relational operators require numeric operands, \
                  logical operators require boolean operands.",
};

pub const E0202_NON_BOOLEAN_CONDITION: ErrorCode = ErrorCode {
    code: "E0202",
    level: DiagnosticLevel::Error,
    category: Category::Type,
    message: "Condition is not boolean",
    explanation: "The condition of an `if`, `while` or `for` must have type `bool`.",
};

pub const E0203_RETURN_TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E0203",
    level: DiagnosticLevel::Error,
    category: Category::Type,
    message: "Return type mismatch",
    explanation: "The returned value does not match the declared return type, \
                  or a `void` function returns a value.",
};

pub const E0204_INVALID_INDEX: ErrorCode = ErrorCode {
    code: "E0204",
    level: DiagnosticLevel::Error,
    category: Category::Type,
    message: "Invalid index",
    explanation: "Arrays and `mapInt` are indexed by `int`, `mapString` is indexed by `string`. \
                  Other types cannot be indexed.",
};

// --- E021x: Declaration Errors ---

pub const E0210_UNDECLARED: ErrorCode = ErrorCode {
    code: "E0210",
    level: DiagnosticLevel::Error,
    category: Category::Declaration,
    message: "Use of undeclared identifier",
    explanation: "The identifier is not declared in the current scope or any enclosing scope. \
                  Make sure it is declared before use and check for typos.",
};

pub const E0211_DUPLICATE_DECLARATION: ErrorCode = ErrorCode {
    code: "E0211",
    level: DiagnosticLevel::Error,
    category: Category::Declaration,
    message: "Duplicate declaration",
    explanation: "An identifier with this name is already declared in the same scope. \
                  Each identifier must be unique within its scope.",
};

pub const E0212_UNKNOWN_BASE_MODEL: ErrorCode = ErrorCode {
    code: "E0212",
    level: DiagnosticLevel::Error,
    category: Category::Declaration,
    message: "Unknown base model",
    explanation: "A model may only extend a model that has been declared.",
};

// --- E022x: Initialization Errors ---

pub const E0220_UNINITIALIZED: ErrorCode = ErrorCode {
    code: "E0220",
    level: DiagnosticLevel::Error,
    category: Category::Initialization,
    message: "Use of uninitialized variable",
    explanation: "The variable is declared but no value has been assigned to it before this use.",
};

// --- E023x: Function Errors ---

pub const E0230_UNDECLARED_FUNCTION: ErrorCode = ErrorCode {
    code: "E0230",
    level: DiagnosticLevel::Error,
    category: Category::Function,
    message: "Call to undeclared function",
    explanation: "The called name is neither a declared function nor one of the built-in IO functions.",
};

pub const E0231_WRONG_ARGUMENT_COUNT: ErrorCode = ErrorCode {
    code: "E0231",
    level: DiagnosticLevel::Error,
    category: Category::Function,
    message: "Wrong number of arguments",
    explanation: "The number of arguments in a function call must match the number of declared parameters.",
};

pub const E0232_MISSING_RETURN: ErrorCode = ErrorCode {
    code: "E0232",
    level: DiagnosticLevel::Error,
    category: Category::Function,
    message: "Missing return statement",
    explanation: "A function with a non-void return type must contain a `return` statement in its body.",
};

pub const E0233_RETURN_OUTSIDE_FUNCTION: ErrorCode = ErrorCode {
    code: "E0233",
    level: DiagnosticLevel::Error,
    category: Category::Function,
    message: "Return outside of a function",
    explanation: "`return` can only appear inside a function body.",
};

// --- W03xx: Warnings ---

pub const W0300_UNUSED_VARIABLE: ErrorCode = ErrorCode {
    code: "W0300",
    level: DiagnosticLevel::Warning,
    category: Category::Unused,
    message: "Unused variable",
    explanation: "The variable is declared but never referenced. Remove it if it is not needed.",
};
