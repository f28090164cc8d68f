pub mod codes;


use ariadne::{Color, Label as AriadneLabel, Report, ReportKind, Source};
use serde::Serialize;
use std::fmt;
use std::io;

use crate::utils::{Position, Span};
use codes::ErrorCode; // 从子模块中导入 ErrorCode 结构体

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// 诊断所属的类别，决定了展示前缀与语义错误的分桶顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Lexical,
    Syntax,
    Type,
    Declaration,
    Initialization,
    Function,
    Unused,
}

impl Category {
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Lexical => "LEXICAL",
            Category::Syntax => "SYNTAX",
            Category::Type => "TYPE",
            Category::Declaration => "DECLARATION",
            Category::Initialization => "INITIALIZATION",
            Category::Function => "FUNCTION",
            Category::Unused => "WARNING",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    // 这些核心字段直接从 ErrorCode 中获取
    code: &'static str,
    level: DiagnosticLevel,
    category: Category,
    // message 是可变的 String，以便添加动态信息（如具体的类型名）
    message: String,
    position: Option<Position>,

    labels: Vec<Label>,
    notes: Vec<String>,
}

impl Diagnostic {
    /// 主构造函数接收一个 ErrorCode 引用作为其核心输入。
    pub fn new(error_code: &'static ErrorCode, primary_label: Label) -> Self {
        Self {
            code: error_code.code,
            level: error_code.level,
            category: error_code.category,
            message: error_code.message.to_string(),
            position: None,
            labels: vec![primary_label],
            notes: Vec::new(),
        }
    }

    /// 用于覆盖默认消息，以包含动态信息。
    pub fn with_dynamic_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_secondary_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn code(&self) -> &str {
        self.code
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

/// 面向用户的单行文本形式。
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.category, self.position) {
            (Category::Syntax, Some(position)) => {
                write!(f, "syntax error at {}: {}", position, self.message)
            }
            (Category::Syntax, None) => write!(f, "syntax error: {}", self.message),
            (Category::Lexical, Some(position)) => {
                write!(f, "invalid token at {}: {}", position, self.message)
            }
            (Category::Lexical, None) => write!(f, "invalid token: {}", self.message),
            (category, _) => write!(f, "[{}] {}", category.tag(), self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::trace!("diagnostic {}: {}", diagnostic.code, diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

// --- Printer 打印逻辑 ---

/// 使用 ariadne 把诊断渲染到标准错误输出。
pub fn print_all<'d>(
    file_name: &str,
    source_code: &str,
    diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
) -> io::Result<()> {
    let cache = (file_name, Source::from(source_code));

    for diag in diagnostics {
        let Some(primary_label_info) = diag.labels.first() else {
            continue;
        };

        let kind = match diag.level {
            DiagnosticLevel::Error => ReportKind::Error,
            DiagnosticLevel::Warning => ReportKind::Warning,
        };

        let color = match diag.level {
            DiagnosticLevel::Error => Color::Red,
            DiagnosticLevel::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, (file_name, primary_label_info.span.into_range()))
            .with_message(diag.to_string())
            .with_code(diag.code);

        for (i, label_info) in diag.labels.iter().enumerate() {
            let label = AriadneLabel::new((file_name, label_info.span.into_range()))
                .with_message(&label_info.message);

            let final_label = if i == 0 {
                label.with_color(color)
            } else {
                label.with_color(Color::Blue)
            };
            report.add_label(final_label);
        }

        for note in &diag.notes {
            report = report.with_note(note);
        }

        report.finish().eprint(cache.clone())?;
    }
    Ok(())
}
