// src/analyzer/expression.rs

use super::types::{MapKey, Type};
use super::{Analyzer, SemanticError};
use crate::parser::ast::{NodeId, NodeKind};

impl<'a> Analyzer<'a> {
    /// 推断一个表达式的类型，顺带报告其中的语义错误。
    ///
    /// 任一操作数的类型未知时，不再对这个表达式报告类型错误。
    pub(super) fn check_expression(&mut self, id: NodeId) -> Type {
        match self.ast.kind(id) {
            NodeKind::Number => {
                if self.ast.value(id).is_some_and(|v| v.contains('.')) {
                    Type::Float
                } else {
                    Type::Int
                }
            }
            NodeKind::Str => Type::Str,
            NodeKind::Boolean => Type::Bool,
            NodeKind::Identifier => match self.ast.value(id) {
                Some(name) => self.use_variable(name, id),
                None => Type::Unknown,
            },
            NodeKind::Operation => self.check_arithmetic(id),
            NodeKind::RelationalOp => self.check_relational(id),
            NodeKind::LogicalOp => self.check_logical(id),
            NodeKind::UnaryOp => self.check_unary(id),
            NodeKind::Call | NodeKind::IoCall => self.check_call(id),
            NodeKind::IndexAccess => self.check_index(id),
            NodeKind::PostfixIncrement => self.check_increment(id),
            NodeKind::List => self.check_list(id),
            NodeKind::AnonymousFunction => self.check_anonymous_function(id),
            NodeKind::KeyValue => {
                for child in self.ast.children(id).to_vec() {
                    self.check_expression(child);
                }
                Type::Unknown
            }
            _ => Type::Unknown,
        }
    }

    fn operands(&mut self, id: NodeId) -> (String, Type, Type) {
        let op = self.ast.value(id).unwrap_or_default().to_string();
        let left = match self.ast.child(id, 0) {
            Some(left) => self.check_expression(left),
            None => Type::Unknown,
        };
        let right = match self.ast.child(id, 1) {
            Some(right) => self.check_expression(right),
            None => Type::Unknown,
        };
        (op, left, right)
    }

    fn check_arithmetic(&mut self, id: NodeId) -> Type {
        let (op, left, right) = self.operands(id);
        if left.is_unknown() || right.is_unknown() {
            return Type::Unknown;
        }
        if !left.is_numeric() || !right.is_numeric() {
            self.report(SemanticError::InvalidOperands { op, left, right }, id);
            return Type::Unknown;
        }
        Type::arithmetic_result(&op, &left, &right)
    }

    /// `< > <= >=` 要求数值操作数，`== != is is not` 要求操作数类型兼容。结果总是 `bool`。
    fn check_relational(&mut self, id: NodeId) -> Type {
        let (op, left, right) = self.operands(id);
        if left.is_unknown() || right.is_unknown() {
            return Type::Bool;
        }
        let valid = match op.as_str() {
            "<" | ">" | "<=" | ">=" => left.is_numeric() && right.is_numeric(),
            _ => left.is_compatible_with(&right),
        };
        if !valid {
            self.report(SemanticError::InvalidOperands { op, left, right }, id);
        }
        Type::Bool
    }

    fn check_logical(&mut self, id: NodeId) -> Type {
        if self.ast.children(id).len() == 1 {
            let op = self.ast.value(id).unwrap_or_default().to_string();
            let found = match self.ast.child(id, 0) {
                Some(operand) => self.check_expression(operand),
                None => Type::Unknown,
            };
            if !found.is_unknown() && found != Type::Bool {
                self.report(
                    SemanticError::InvalidOperand {
                        op,
                        expected: "boolean",
                        found,
                    },
                    id,
                );
            }
            return Type::Bool;
        }

        let (op, left, right) = self.operands(id);
        if left.is_unknown() || right.is_unknown() {
            return Type::Bool;
        }
        if left != Type::Bool || right != Type::Bool {
            self.report(SemanticError::NonBooleanOperands { op, left, right }, id);
        }
        Type::Bool
    }

    fn check_unary(&mut self, id: NodeId) -> Type {
        let op = self.ast.value(id).unwrap_or_default().to_string();
        let found = match self.ast.child(id, 0) {
            Some(operand) => self.check_expression(operand),
            None => Type::Unknown,
        };
        if found.is_unknown() {
            return Type::Unknown;
        }
        if !found.is_numeric() {
            self.report(
                SemanticError::InvalidOperand {
                    op,
                    expected: "numeric",
                    found,
                },
                id,
            );
            return Type::Unknown;
        }
        found
    }

    /// `a[i]`：数组与 `mapInt` 用 `int` 下标，`mapString` 用 `string` 下标。
    fn check_index(&mut self, id: NodeId) -> Type {
        let name = self.ast.value(id).unwrap_or_default().to_string();
        let container = self.use_variable(&name, id);
        let index = match self.ast.child(id, 0) {
            Some(index) => self.check_expression(index),
            None => Type::Unknown,
        };
        if container.is_unknown() {
            return Type::Unknown;
        }
        let Some((expected, element)) = container.index_types() else {
            self.report(
                SemanticError::NotIndexable {
                    name,
                    found: container,
                },
                id,
            );
            return Type::Unknown;
        };
        if !index.is_unknown() && index != expected {
            self.report(
                SemanticError::InvalidIndex {
                    name,
                    expected,
                    found: index,
                },
                id,
            );
        }
        element
    }

    /// 列表字面量：元素类型一致时为 `T[]`；全部是 `键: 值` 时为映射；其余情况未知。
    fn check_list(&mut self, id: NodeId) -> Type {
        let items = self.ast.children(id).to_vec();
        if items.is_empty() {
            return Type::Unknown;
        }

        if items.iter().all(|&i| self.is_kind(i, NodeKind::KeyValue)) {
            let mut keys = Vec::new();
            let mut values = Vec::new();
            for &item in &items {
                let pair = self.ast.children(item).to_vec();
                let key = pair.first().map_or(Type::Unknown, |&k| self.check_expression(k));
                let value = pair.get(1).map_or(Type::Unknown, |&v| self.check_expression(v));
                keys.push(key);
                values.push(value);
            }
            let key = match common_type(&keys) {
                Some(Type::Int) => MapKey::Int,
                Some(Type::Str) => MapKey::Str,
                _ => return Type::Unknown,
            };
            let value = common_type(&values).unwrap_or(Type::Unknown);
            return Type::Map {
                key,
                value: Box::new(value),
            };
        }

        let types: Vec<Type> = items.iter().map(|&i| self.check_expression(i)).collect();
        match common_type(&types) {
            Some(element) => Type::Array(Box::new(element)),
            None => Type::Unknown,
        }
    }
}

/// 所有类型都相同且已知时返回这个类型。
fn common_type(types: &[Type]) -> Option<Type> {
    let first = types.first()?;
    if first.is_unknown() || types.iter().any(|t| t != first) {
        return None;
    }
    Some(first.clone())
}
