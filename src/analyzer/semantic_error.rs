use thiserror::Error;

use super::types::Type;
use crate::diagnostics::codes::{self, ErrorCode};
use crate::diagnostics::{Diagnostic, Label};
use crate::utils::Span;

/// 语义错误与警告。`Display` 给出不带分类前缀的消息文本。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    // --- 类型 ---
    #[error("Cannot assign '{found}' to variable of type '{declared}'")]
    InitializerMismatch { declared: Type, found: Type },

    #[error("Cannot assign '{found}' to '{name}' of type '{declared}'")]
    AssignmentMismatch {
        name: String,
        declared: Type,
        found: Type,
    },

    #[error("Argument {index} of '{function}': expected '{expected}' but received '{found}'")]
    ArgumentMismatch {
        function: String,
        index: usize,
        expected: Type,
        found: Type,
    },

    #[error("Operator '{op}' not valid for types '{left}' and '{right}'")]
    InvalidOperands { op: String, left: Type, right: Type },

    #[error("Operator '{op}' requires boolean operands, found '{left}' and '{right}'")]
    NonBooleanOperands { op: String, left: Type, right: Type },

    #[error("Operator '{op}' requires a {expected} operand, found '{found}'")]
    InvalidOperand {
        op: String,
        expected: &'static str,
        found: Type,
    },

    #[error("'{name}' of type '{found}' cannot be used with '{op}', a numeric variable is required")]
    NonNumericTarget { name: String, op: String, found: Type },

    #[error("The {construct} condition must be boolean, found '{found}'")]
    NonBooleanCondition { construct: &'static str, found: Type },

    #[error("Function '{function}' must not return a value")]
    UnexpectedReturnValue { function: String },

    #[error("Function '{function}' must return a value of type '{expected}'")]
    MissingReturnValue { function: String, expected: Type },

    #[error("Incompatible return type: expected '{expected}' but found '{found}'")]
    ReturnTypeMismatch { expected: Type, found: Type },

    #[error("Index of '{name}' must be '{expected}', found '{found}'")]
    InvalidIndex {
        name: String,
        expected: Type,
        found: Type,
    },

    #[error("'{name}' of type '{found}' cannot be indexed")]
    NotIndexable { name: String, found: Type },

    // --- 声明 ---
    #[error("Variable '{name}' not declared")]
    Undeclared { name: String },

    #[error("{kind} '{name}' already declared in this scope")]
    Duplicate { kind: &'static str, name: String },

    #[error("Model '{model}' extends undeclared model '{base}'")]
    UnknownBaseModel { model: String, base: String },

    // --- 初始化 ---
    #[error("Variable '{name}' used without being initialized")]
    Uninitialized { name: String },

    // --- 函数 ---
    #[error("Function '{name}' not declared")]
    UndeclaredFunction { name: String },

    #[error("Function '{name}' expects {expected} arguments but received {found}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Function '{function}' must return a value of type '{expected}'")]
    MissingReturn { function: String, expected: Type },

    #[error("Return outside of a function")]
    ReturnOutsideFunction,

    // --- 警告 ---
    #[error("Variable '{name}' declared but never used")]
    UnusedVariable { name: String },
}

impl SemanticError {
    fn code(&self) -> &'static ErrorCode {
        match self {
            SemanticError::InitializerMismatch { .. }
            | SemanticError::AssignmentMismatch { .. }
            | SemanticError::ArgumentMismatch { .. } => &codes::E0200_TYPE_MISMATCH,
            SemanticError::InvalidOperands { .. }
            | SemanticError::NonBooleanOperands { .. }
            | SemanticError::InvalidOperand { .. }
            | SemanticError::NonNumericTarget { .. } => &codes::E0201_INVALID_OPERANDS,
            SemanticError::NonBooleanCondition { .. } => &codes::E0202_NON_BOOLEAN_CONDITION,
            SemanticError::UnexpectedReturnValue { .. }
            | SemanticError::MissingReturnValue { .. }
            | SemanticError::ReturnTypeMismatch { .. } => &codes::E0203_RETURN_TYPE_MISMATCH,
            SemanticError::InvalidIndex { .. } | SemanticError::NotIndexable { .. } => {
                &codes::E0204_INVALID_INDEX
            }
            SemanticError::Undeclared { .. } => &codes::E0210_UNDECLARED,
            SemanticError::Duplicate { .. } => &codes::E0211_DUPLICATE_DECLARATION,
            SemanticError::UnknownBaseModel { .. } => &codes::E0212_UNKNOWN_BASE_MODEL,
            SemanticError::Uninitialized { .. } => &codes::E0220_UNINITIALIZED,
            SemanticError::UndeclaredFunction { .. } => &codes::E0230_UNDECLARED_FUNCTION,
            SemanticError::WrongArgumentCount { .. } => &codes::E0231_WRONG_ARGUMENT_COUNT,
            SemanticError::MissingReturn { .. } => &codes::E0232_MISSING_RETURN,
            SemanticError::ReturnOutsideFunction => &codes::E0233_RETURN_OUTSIDE_FUNCTION,
            SemanticError::UnusedVariable { .. } => &codes::W0300_UNUSED_VARIABLE,
        }
    }

    /// 转换为指向 `span` 的诊断。分类与级别由错误码决定。
    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        let message = self.to_string();
        let code = self.code();
        Diagnostic::new(code, Label::new(span, message.clone()))
            .with_dynamic_message(message)
            .with_note(code.explanation)
    }
}
