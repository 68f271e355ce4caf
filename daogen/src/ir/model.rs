//! Plain syntax-tree backend.
//!
//! Nodes are ordinary enums, so callers can walk what the synthesizer
//! produced without parsing any text.

use super::{AssignOp, BinaryOp, IrBuilder, TypeRef, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Selector { object: Box<Expr>, member: String },
    Str(String),
    Int(i64),
    Nil,
    Call { callee: Box<Expr>, args: Vec<Expr>, spread: bool },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
}

impl Expr {
    /// Calls `visit` on this expression and every nested one.
    pub fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Selector { object, .. } => object.walk(visit),
            Expr::Call { callee, args, .. } => {
                callee.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Ident(_) | Expr::Str(_) | Expr::Int(_) | Expr::Nil => {}
        }
    }

    pub fn mentions(&self, ident: &str) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            if matches!(expr, Expr::Ident(name) if name == ident) {
                found = true;
            }
        });
        found
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    Assign { targets: Vec<Expr>, op: AssignOp, values: Vec<Expr> },
    If { init: Option<Box<Stmt>>, cond: Expr, body: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    Defer(Expr),
    Var { name: String, ty: Option<TypeRef>, value: Option<Expr> },
    Return(Vec<Expr>),
}

impl Stmt {
    /// Calls `visit` on every expression reachable from this statement,
    /// including the ones inside nested bodies.
    pub fn walk_exprs(&self, visit: &mut dyn FnMut(&Expr)) {
        match self {
            Stmt::Expr(expr) | Stmt::Defer(expr) => expr.walk(visit),
            Stmt::Assign { targets, values, .. } => {
                for expr in targets.iter().chain(values) {
                    expr.walk(visit);
                }
            }
            Stmt::If { init, cond, body } => {
                if let Some(init) = init {
                    init.walk_exprs(visit);
                }
                cond.walk(visit);
                for stmt in body {
                    stmt.walk_exprs(visit);
                }
            }
            Stmt::While { cond, body } => {
                cond.walk(visit);
                for stmt in body {
                    stmt.walk_exprs(visit);
                }
            }
            Stmt::Var { value, .. } => {
                if let Some(value) = value {
                    value.walk(visit);
                }
            }
            Stmt::Return(values) => {
                for value in values {
                    value.walk(visit);
                }
            }
        }
    }

    pub fn mentions(&self, ident: &str) -> bool {
        let mut found = false;
        self.walk_exprs(&mut |expr| {
            if matches!(expr, Expr::Ident(name) if name == ident) {
                found = true;
            }
        });
        found
    }

    pub fn is_guard(&self) -> bool {
        matches!(self, Stmt::If { init: None, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeRef,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub fields: Vec<Field>,
}

impl TypeSpec {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .flat_map(|field| field.names.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Type(TypeSpec),
    Func {
        name: String,
        params: Vec<Field>,
        results: Vec<Field>,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelBuilder;

impl ModelBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl IrBuilder for ModelBuilder {
    type Expr = Expr;
    type Stmt = Stmt;
    type Type = TypeRef;
    type Field = Field;
    type TypeSpec = TypeSpec;
    type Decl = Decl;

    fn ident(&self, name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    fn selector(&self, object: Expr, member: &str) -> Expr {
        Expr::Selector {
            object: Box::new(object),
            member: member.to_string(),
        }
    }

    fn string_lit(&self, value: &str) -> Expr {
        Expr::Str(value.to_string())
    }

    fn int_lit(&self, value: i64) -> Expr {
        Expr::Int(value)
    }

    fn nil(&self) -> Expr {
        Expr::Nil
    }

    fn apply(&self, callee: Expr, args: Vec<Expr>, spread: bool) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args,
            spread,
        }
    }

    fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    fn assign(&self, targets: Vec<Expr>, op: AssignOp, values: Vec<Expr>) -> Stmt {
        Stmt::Assign { targets, op, values }
    }

    fn if_stmt(&self, init: Option<Stmt>, cond: Expr, body: Vec<Stmt>) -> Stmt {
        Stmt::If {
            init: init.map(Box::new),
            cond,
            body,
        }
    }

    fn while_stmt(&self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        Stmt::While { cond, body }
    }

    fn defer_stmt(&self, call: Expr) -> Stmt {
        Stmt::Defer(call)
    }

    fn var_stmt(&self, name: &str, ty: Option<TypeRef>, value: Option<Expr>) -> Stmt {
        Stmt::Var {
            name: name.to_string(),
            ty,
            value,
        }
    }

    fn return_stmt(&self, values: Vec<Expr>) -> Stmt {
        Stmt::Return(values)
    }

    fn named_type(&self, name: &str) -> TypeRef {
        TypeRef::named(name)
    }

    fn pointer_type(&self, inner: TypeRef) -> TypeRef {
        TypeRef::pointer(inner)
    }

    fn slice_type(&self, element: TypeRef) -> TypeRef {
        TypeRef::slice(element)
    }

    fn field(&self, names: &[String], ty: TypeRef, tag: Option<&str>) -> Field {
        Field {
            names: names.to_vec(),
            ty,
            tag: tag.map(str::to_string),
        }
    }

    fn struct_spec(&self, name: &str, fields: Vec<Field>) -> TypeSpec {
        TypeSpec {
            name: name.to_string(),
            fields,
        }
    }

    fn type_decl(&self, spec: TypeSpec) -> Decl {
        Decl::Type(spec)
    }

    fn func_decl(&self, name: &str, params: Vec<Field>, results: Vec<Field>, body: Vec<Stmt>) -> Decl {
        Decl::Func {
            name: name.to_string(),
            params,
            results,
            body,
        }
    }
}
