//! Backend-neutral construction of syntax-tree fragments.
//!
//! The synthesizer never builds target syntax directly. It talks to an
//! [`IrBuilder`], which decides what an expression, a statement or a type
//! declaration actually is. Two backends ship with the crate:
//!
//! - [`model::ModelBuilder`] produces a plain tree that can be inspected.
//! - [`source::GoSourceBuilder`] produces Go source text.

pub mod functions;
pub mod model;
pub mod source;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, SynthError};
use crate::naming;

/// Describes a callable so argument counts can be checked at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallDescriptor {
    /// Dotted path of the function, e.g. `strings.Join`, or a bare method name.
    pub function: Cow<'static, str>,
    /// Minimum number of arguments. Also the maximum unless `extensible`.
    pub min_args: usize,
    /// The function accepts more than `min_args` arguments.
    pub extensible: bool,
}

impl CallDescriptor {
    pub const fn fixed(function: &'static str, args: usize) -> Self {
        Self {
            function: Cow::Borrowed(function),
            min_args: args,
            extensible: false,
        }
    }

    pub const fn variadic(function: &'static str, min_args: usize) -> Self {
        Self {
            function: Cow::Borrowed(function),
            min_args,
            extensible: true,
        }
    }

    pub fn new(function: impl Into<Cow<'static, str>>, min_args: usize, extensible: bool) -> Self {
        Self {
            function: function.into(),
            min_args,
            extensible,
        }
    }

    pub fn check_args(&self, count: usize) -> Result<()> {
        if count < self.min_args || (!self.extensible && count > self.min_args) {
            return Err(SynthError::ArgumentCount {
                function: self.function.to_string(),
                min: self.min_args,
                extensible: self.extensible,
                found: count,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Greater,
    Less,
    Add,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::Add => "+",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    AddressOf,
    Deref,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`
    AddAssign,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::AddAssign => "+=",
        }
    }
}

/// Target-language type as written in field metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A possibly package-qualified name: `string`, `time.Time`.
    Named(String),
    /// `*T`
    Pointer(Box<TypeRef>),
    /// `[]T`
    Slice(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn pointer(inner: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(inner))
    }

    pub fn slice(element: TypeRef) -> Self {
        TypeRef::Slice(Box::new(element))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeRef::Pointer(_))
    }

    /// The pointed-to type, or `self` when not a pointer.
    pub fn pointee(&self) -> &TypeRef {
        match self {
            TypeRef::Pointer(inner) => inner,
            other => other,
        }
    }

    /// Element type of a slice, looking through one pointer.
    pub fn element(&self) -> Option<&TypeRef> {
        match self.pointee() {
            TypeRef::Slice(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Pointer(inner) => write!(f, "*{inner}"),
            TypeRef::Slice(element) => write!(f, "[]{element}"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('*') {
            return Ok(TypeRef::pointer(rest.parse()?));
        }
        if let Some(rest) = s.strip_prefix("[]") {
            return Ok(TypeRef::slice(rest.parse()?));
        }
        naming::ensure_type_name(s)?;
        Ok(TypeRef::Named(s.to_string()))
    }
}

/// Array type used to bind a multi-value argument.
///
/// Well-known element kinds map to named array aliases the generated package
/// provides. Anything else falls back to a plain slice.
pub fn sql_array_type(element: &TypeRef) -> TypeRef {
    let alias = match element {
        TypeRef::Named(name) => match name.as_str() {
            "string" => Some("SqlStringArray"),
            "int" | "int8" | "int16" | "int32" | "int64" => Some("SqlIntegerArray"),
            "uint" | "uint8" | "uint16" | "uint32" | "uint64" => Some("SqlUnsignedArray"),
            "float32" | "float64" => Some("SqlFloatArray"),
            _ => None,
        },
        _ => None,
    };
    match alias {
        Some(alias) => TypeRef::named(alias),
        None => TypeRef::slice(element.clone()),
    }
}

/// Constructors the synthesizer needs from a syntax-tree backend.
///
/// Required methods map one-to-one onto node kinds. Provided methods compose
/// them and enforce call descriptors, so every backend gets the same argument
/// count checks.
pub trait IrBuilder {
    type Expr: Clone + fmt::Debug;
    type Stmt: fmt::Debug;
    type Type: Clone + fmt::Debug;
    type Field: Clone + fmt::Debug;
    type TypeSpec: Clone + fmt::Debug;
    type Decl: fmt::Debug;

    fn ident(&self, name: &str) -> Self::Expr;
    fn selector(&self, object: Self::Expr, member: &str) -> Self::Expr;
    fn string_lit(&self, value: &str) -> Self::Expr;
    fn int_lit(&self, value: i64) -> Self::Expr;
    fn nil(&self) -> Self::Expr;
    /// Raw call node. Prefer [`IrBuilder::call`], which validates arity.
    fn apply(&self, callee: Self::Expr, args: Vec<Self::Expr>, spread: bool) -> Self::Expr;
    fn binary(&self, op: BinaryOp, left: Self::Expr, right: Self::Expr) -> Self::Expr;
    fn unary(&self, op: UnaryOp, operand: Self::Expr) -> Self::Expr;

    fn expr_stmt(&self, expr: Self::Expr) -> Self::Stmt;
    fn assign(&self, targets: Vec<Self::Expr>, op: AssignOp, values: Vec<Self::Expr>) -> Self::Stmt;
    fn if_stmt(&self, init: Option<Self::Stmt>, cond: Self::Expr, body: Vec<Self::Stmt>) -> Self::Stmt;
    fn while_stmt(&self, cond: Self::Expr, body: Vec<Self::Stmt>) -> Self::Stmt;
    fn defer_stmt(&self, call: Self::Expr) -> Self::Stmt;
    fn var_stmt(&self, name: &str, ty: Option<Self::Type>, value: Option<Self::Expr>) -> Self::Stmt;
    fn return_stmt(&self, values: Vec<Self::Expr>) -> Self::Stmt;

    fn named_type(&self, name: &str) -> Self::Type;
    fn pointer_type(&self, inner: Self::Type) -> Self::Type;
    fn slice_type(&self, element: Self::Type) -> Self::Type;
    fn field(&self, names: &[String], ty: Self::Type, tag: Option<&str>) -> Self::Field;
    fn struct_spec(&self, name: &str, fields: Vec<Self::Field>) -> Self::TypeSpec;
    fn type_decl(&self, spec: Self::TypeSpec) -> Self::Decl;
    fn func_decl(
        &self,
        name: &str,
        params: Vec<Self::Field>,
        results: Vec<Self::Field>,
        body: Vec<Self::Stmt>,
    ) -> Self::Decl;

    /// Dotted path such as `strings.Join` as nested selectors.
    fn path(&self, path: &str) -> Self::Expr {
        let mut segments = path.split('.');
        let head = self.ident(segments.next().unwrap_or_default());
        segments.fold(head, |object, member| self.selector(object, member))
    }

    fn call(&self, descriptor: &CallDescriptor, args: Vec<Self::Expr>) -> Result<Self::Expr> {
        descriptor.check_args(args.len())?;
        Ok(self.apply(self.path(&descriptor.function), args, false))
    }

    /// Call whose last argument is expanded (`args...`).
    fn call_spread(&self, descriptor: &CallDescriptor, args: Vec<Self::Expr>) -> Result<Self::Expr> {
        descriptor.check_args(args.len())?;
        Ok(self.apply(self.path(&descriptor.function), args, true))
    }

    /// `receiver.method(args)`, where the descriptor names the method.
    fn method_call(
        &self,
        receiver: Self::Expr,
        descriptor: &CallDescriptor,
        args: Vec<Self::Expr>,
    ) -> Result<Self::Expr> {
        descriptor.check_args(args.len())?;
        Ok(self.apply(self.selector(receiver, &descriptor.function), args, false))
    }

    fn defer_call(&self, descriptor: &CallDescriptor, args: Vec<Self::Expr>) -> Result<Self::Stmt> {
        Ok(self.defer_stmt(self.call(descriptor, args)?))
    }

    fn not(&self, expr: Self::Expr) -> Self::Expr {
        self.unary(UnaryOp::Not, expr)
    }

    fn address_of(&self, expr: Self::Expr) -> Self::Expr {
        self.unary(UnaryOp::AddressOf, expr)
    }

    fn deref(&self, expr: Self::Expr) -> Self::Expr {
        self.unary(UnaryOp::Deref, expr)
    }

    fn not_nil(&self, expr: Self::Expr) -> Self::Expr {
        self.binary(BinaryOp::NotEq, expr, self.nil())
    }

    fn resolve_type(&self, ty: &TypeRef) -> Self::Type {
        match ty {
            TypeRef::Named(name) => self.named_type(name),
            TypeRef::Pointer(inner) => self.pointer_type(self.resolve_type(inner)),
            TypeRef::Slice(element) => self.slice_type(self.resolve_type(element)),
        }
    }

    /// `target = append(target, values...)`
    fn append_to(&self, target: &str, values: Vec<Self::Expr>) -> Result<Self::Stmt> {
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(self.ident(target));
        args.extend(values);
        let call = self.call(&functions::APPEND, args)?;
        Ok(self.assign(vec![self.ident(target)], AssignOp::Assign, vec![call]))
    }

    /// Creates a call with an error checking branch:
    ///
    /// ```text
    /// if <target>, err = call; err != nil {
    ///     return
    /// }
    /// ```
    ///
    /// `target` can be omitted.
    fn call_with_err_check(&self, target: Option<&str>, call: Self::Expr) -> Self::Stmt {
        let mut targets = Vec::with_capacity(2);
        if let Some(target) = target {
            targets.push(self.ident(target));
        }
        targets.push(self.ident("err"));
        self.if_stmt(
            Some(self.assign(targets, AssignOp::Assign, vec![call])),
            self.not_nil(self.ident("err")),
            vec![self.return_stmt(Vec::new())],
        )
    }
}
