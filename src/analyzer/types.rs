// src/analyzer/types.rs

use std::fmt;

/// 映射类型的键：`mapInt` 以整数为键，`mapString` 以字符串为键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int,
    Str,
}

/// 语义分析使用的类型。
///
/// 源代码中的类型写法（`int`、`float[]`、`mapInt<string>`、`Point`）
/// 都由 `Type::from_name` 解析得到，`Display` 则给出相同的写法。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    // 基本类型
    Void,
    Int,
    Float,
    Char,
    Bool,
    Str,

    // 声明本身的类型
    Function,
    Model,
    Template,

    // 复合类型
    Array(Box<Type>),
    Map { key: MapKey, value: Box<Type> },

    // 用户定义的模型名
    Named(String),

    /// 无法推断。参与运算时不再报告错误，避免一个错误引起连锁反应。
    Unknown,
}

impl Type {
    /// 把源代码中的类型写法解析为 `Type`。
    pub fn from_name(name: &str) -> Type {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return Type::Array(Box::new(Type::from_name(element)));
        }
        match name {
            "" => Type::Unknown,
            "void" => Type::Void,
            "int" => Type::Int,
            "float" => Type::Float,
            "char" => Type::Char,
            "bool" => Type::Bool,
            "string" => Type::Str,
            "function" => Type::Function,
            "model" => Type::Model,
            "template" => Type::Template,
            _ => {
                for (prefix, key) in [("mapInt", MapKey::Int), ("mapString", MapKey::Str)] {
                    if let Some(rest) = name.strip_prefix(prefix) {
                        let value = rest
                            .strip_prefix('<')
                            .and_then(|r| r.strip_suffix('>'))
                            .map_or(Type::Unknown, Type::from_name);
                        return Type::Map {
                            key,
                            value: Box::new(value),
                        };
                    }
                }
                Type::Named(name.to_string())
            }
        }
    }

    /// 一个辅助函数，用于获取类型的字节大小。
    pub fn size(&self) -> usize {
        match self {
            Type::Void => 0,
            Type::Char | Type::Bool => 1,
            Type::Int | Type::Float => 4,
            Type::Str => 8,
            _ => 4,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// 两个类型能否互相赋值或比较。
    ///
    /// 相同类型总是兼容；`int` 与 `float`、`bool` 与 `int` 之间允许隐式转换。
    /// 未知类型与任何类型兼容。
    pub fn is_compatible_with(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (a, b) if a == b => true,
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => true,
            (Type::Bool, Type::Int) | (Type::Int, Type::Bool) => true,
            (Type::Array(a), Type::Array(b)) => a.is_compatible_with(b),
            (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
                k1 == k2 && v1.is_compatible_with(v2)
            }
            _ => false,
        }
    }

    /// 算术运算的结果类型：`%` 总是 `int`，其余只要有一侧是 `float` 就是 `float`。
    pub fn arithmetic_result(op: &str, left: &Type, right: &Type) -> Type {
        if op == "%" {
            Type::Int
        } else if *left == Type::Float || *right == Type::Float {
            Type::Float
        } else {
            Type::Int
        }
    }

    /// 下标访问所需的下标类型与得到的元素类型。不能被索引时返回 `None`。
    pub fn index_types(&self) -> Option<(Type, Type)> {
        match self {
            Type::Array(element) => Some((Type::Int, (**element).clone())),
            Type::Map { key: MapKey::Int, value } => Some((Type::Int, (**value).clone())),
            Type::Map { key: MapKey::Str, value } => Some((Type::Str, (**value).clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Char => f.write_str("char"),
            Type::Bool => f.write_str("bool"),
            Type::Str => f.write_str("string"),
            Type::Function => f.write_str("function"),
            Type::Model => f.write_str("model"),
            Type::Template => f.write_str("template"),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Map { key, value } => {
                let prefix = match key {
                    MapKey::Int => "mapInt",
                    MapKey::Str => "mapString",
                };
                if value.is_unknown() {
                    f.write_str(prefix)
                } else {
                    write!(f, "{}<{}>", prefix, value)
                }
            }
            Type::Named(name) => f.write_str(name),
            Type::Unknown => f.write_str("unknown"),
        }
    }
}
