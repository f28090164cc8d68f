use super::types::Type;
use super::{Analyzer, FunctionContext, SemanticError};
use crate::lexer::Keyword;
use crate::parser::ast::{NodeId, NodeKind};
use crate::symtab::{Param, SymbolCategory, SymbolRecord};

impl<'a> Analyzer<'a> {
    /// 函数声明：登记函数符号，打开函数作用域，登记参数并分析函数体。
    ///
    /// 返回类型不是 `void` 的函数，其直接函数体中必须至少有一条 `return`。
    pub(super) fn check_function(&mut self, id: NodeId) {
        let Some(name) = self.ast.value(id).map(str::to_string) else {
            return;
        };
        let return_name = self
            .ast
            .child_of_kind(id, NodeKind::ReturnType)
            .and_then(|r| self.ast.value(r))
            .unwrap_or("void")
            .to_string();
        let return_type = Type::from_name(&return_name);
        let params = self.signature(id);

        let record = SymbolRecord::new(&name, SymbolCategory::Function, &return_name, self.ast.line(id))
            .initialized(true)
            .with_size(return_type.size())
            .with_signature(params, &return_name);
        self.declare(self.scope, record, id);

        let segment = format!("func_{}", name);
        self.check_function_body(id, &segment, &name, return_type.clone());

        let returns = self
            .ast
            .statements(id)
            .iter()
            .any(|&s| self.is_kind(s, NodeKind::Return));
        if return_type != Type::Void && !return_type.is_unknown() && !returns {
            self.report(
                SemanticError::MissingReturn {
                    function: name,
                    expected: return_type,
                },
                id,
            );
        }
    }

    /// 匿名函数：没有声明的返回类型，不检查 `return`。
    pub(super) fn check_anonymous_function(&mut self, id: NodeId) -> Type {
        self.check_function_body(id, "func_anonymous", "anonymous", Type::Unknown);
        Type::Function
    }

    fn check_function_body(&mut self, id: NodeId, segment: &str, name: &str, return_type: Type) {
        let previous_scope = self.enter_scope(segment);
        let previous_function = self.function.replace(FunctionContext {
            name: name.to_string(),
            return_type,
        });

        if let Some(params) = self.ast.child_of_kind(id, NodeKind::Params) {
            for &param in self.ast.children(params) {
                let Some(param_name) = self.ast.value(param) else {
                    continue;
                };
                let ty = self
                    .ast
                    .child(param, 0)
                    .and_then(|t| self.ast.value(t))
                    .unwrap_or_default();
                let record = SymbolRecord::new(param_name, SymbolCategory::Parameter, ty, self.ast.line(param))
                    .initialized(true)
                    .with_size(Type::from_name(ty).size());
                self.declare(self.scope, record, param);
            }
        }

        let statements = self.ast.statements(id).to_vec();
        self.check_statements(&statements);

        self.function = previous_function;
        self.exit_scope(previous_scope);
    }

    /// 从 `Params` 子节点提取参数签名。
    fn signature(&self, id: NodeId) -> Vec<Param> {
        let Some(params) = self.ast.child_of_kind(id, NodeKind::Params) else {
            return Vec::new();
        };
        self.ast
            .children(params)
            .iter()
            .map(|&p| Param {
                name: self.ast.value(p).unwrap_or_default().to_string(),
                ty: self
                    .ast
                    .child(p, 0)
                    .and_then(|t| self.ast.value(t))
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }

    /// 函数调用：先在可见作用域中找函数，找不到再看内置 IO 函数。
    /// 参数个数不符是函数错误，每个类型不符的参数是一个类型错误。
    pub(super) fn check_call(&mut self, id: NodeId) -> Type {
        let name = self.ast.value(id).unwrap_or_default().to_string();
        let args = self.ast.children(id).to_vec();
        let arg_types: Vec<Type> = args.iter().map(|&a| self.check_expression(a)).collect();

        if self.is_kind(id, NodeKind::IoCall) {
            return io_return_type(&name);
        }

        let symbol = self
            .table
            .resolve(self.scope, &name)
            .filter(|&s| self.table.get(s).category == SymbolCategory::Function);
        let Some(symbol) = symbol else {
            if is_io_builtin(&name) {
                return io_return_type(&name);
            }
            self.report(SemanticError::UndeclaredFunction { name }, id);
            return Type::Unknown;
        };

        let record = self.table.get_mut(symbol);
        record.references += 1;
        let return_type = Type::from_name(record.return_type.as_deref().unwrap_or(&record.ty));
        // 导入的函数没有已知签名
        let Some(params) = record.params.clone() else {
            return Type::Unknown;
        };

        if params.len() != args.len() {
            self.report(
                SemanticError::WrongArgumentCount {
                    name,
                    expected: params.len(),
                    found: args.len(),
                },
                id,
            );
            return return_type;
        }
        for (index, ((param, found), &arg)) in params.iter().zip(arg_types).zip(&args).enumerate() {
            let expected = Type::from_name(&param.ty);
            if !found.is_unknown() && !expected.is_compatible_with(&found) {
                self.report(
                    SemanticError::ArgumentMismatch {
                        function: name.clone(),
                        index: index + 1,
                        expected,
                        found,
                    },
                    arg,
                );
            }
        }
        return_type
    }
}

fn is_io_builtin(name: &str) -> bool {
    Keyword::from_word(name).is_some_and(|k| k.is_io_builtin())
}

/// 内置 IO 函数的返回类型：输出函数返回 `void`，输入函数按读取的内容返回。
fn io_return_type(name: &str) -> Type {
    match name {
        "input" | "readLine" => Type::Str,
        "readInt" => Type::Int,
        "readFloat" => Type::Float,
        _ => Type::Void,
    }
}
