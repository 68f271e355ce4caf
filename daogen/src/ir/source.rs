//! Go source text backend.
//!
//! Expressions are kept as a small tree and printed with gofmt's spacing:
//! binary operators lose their blanks once nested inside multi-argument
//! calls or under a looser operator. Statements and declarations are
//! tab-indented text without a trailing newline.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;

use super::{AssignOp, BinaryOp, IrBuilder, UnaryOp};

const PREC_LOWEST: u8 = 0;
const PREC_UNARY: u8 = 6;
const PREC_PRIMARY: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoExpr {
    /// Identifier or literal, printed verbatim.
    Atom(String),
    Selector(Box<GoExpr>, String),
    Call {
        callee: Box<GoExpr>,
        args: Vec<GoExpr>,
        spread: bool,
    },
    Binary {
        op: BinaryOp,
        left: Box<GoExpr>,
        right: Box<GoExpr>,
    },
    Unary(UnaryOp, Box<GoExpr>),
    Paren(Box<GoExpr>),
}

impl GoExpr {
    fn prec(&self) -> u8 {
        match self {
            GoExpr::Binary { op, .. } => binary_prec(*op),
            GoExpr::Unary(..) => PREC_UNARY,
            _ => PREC_PRIMARY,
        }
    }

    /// Wraps `self` in parentheses when it binds looser than `prec`.
    fn at_least(self, prec: u8) -> Box<GoExpr> {
        if self.prec() >= prec {
            Box::new(self)
        } else {
            Box::new(GoExpr::Paren(Box::new(self)))
        }
    }

    fn write(&self, out: &mut String, prec1: u8, depth: u32) {
        match self {
            GoExpr::Atom(text) => out.push_str(text),
            GoExpr::Selector(object, member) => {
                object.write(out, PREC_PRIMARY, depth);
                out.push('.');
                out.push_str(member);
            }
            GoExpr::Call { callee, args, spread } => {
                let depth = if args.len() > 1 { depth + 1 } else { depth };
                callee.write(out, PREC_PRIMARY, depth);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write(out, PREC_LOWEST, depth);
                }
                if *spread && !args.is_empty() {
                    out.push_str("...");
                }
                out.push(')');
            }
            GoExpr::Binary { op, left, right } => {
                let prec = binary_prec(*op);
                if prec < prec1 {
                    out.push('(');
                    self.write(out, PREC_LOWEST, reduce_depth(depth));
                    out.push(')');
                    return;
                }
                let blank = if prec < cutoff(depth) { " " } else { "" };
                let left_depth = match left.as_ref() {
                    GoExpr::Binary { op, .. } if binary_prec(*op) == prec => depth,
                    _ => depth + 1,
                };
                left.write(out, prec, left_depth);
                out.push_str(blank);
                out.push_str(op.symbol());
                out.push_str(blank);
                right.write(out, prec + 1, depth + 1);
            }
            GoExpr::Unary(op, operand) => {
                if PREC_UNARY < prec1 {
                    out.push('(');
                    self.write(out, PREC_LOWEST, reduce_depth(depth));
                    out.push(')');
                    return;
                }
                out.push_str(op.symbol());
                operand.write(out, PREC_UNARY, depth);
            }
            GoExpr::Paren(inner) => {
                out.push('(');
                inner.write(out, PREC_LOWEST, reduce_depth(depth));
                out.push(')');
            }
        }
    }


    fn render(&self, depth: u32) -> String {
        let mut out = String::new();
        self.write(&mut out, PREC_LOWEST, depth);
        out
    }
}

impl fmt::Display for GoExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(1))
    }
}

/// Operators binding looser than the cutoff are surrounded by blanks.
///
/// At statement level only `*`-class operators lose them, deeper down `+`
/// does too. Nothing here binds at `*` precedence.
fn cutoff(depth: u32) -> u8 {
    if depth == 1 { 6 } else { 4 }
}

fn reduce_depth(depth: u32) -> u32 {
    depth.saturating_sub(1).max(1)
}

fn binary_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Greater | BinaryOp::Less => 3,
        BinaryOp::Add => 4,
    }
}

/// Struct field or parameter: `names type `tag``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoField {
    names: Vec<String>,
    ty: String,
    tag: Option<String>,
}

impl GoField {
    fn name_cell(&self) -> Option<String> {
        (!self.names.is_empty()).then(|| self.names.join(", "))
    }
}

impl fmt::Display for GoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(names) = self.name_cell() {
            write!(f, "{names} ")?;
        }
        f.write_str(&self.ty)?;
        if let Some(tag) = &self.tag {
            write!(f, " `{tag}`")?;
        }
        Ok(())
    }
}

/// Lays out struct fields in gofmt's columns.
///
/// Names are padded across each run of named fields, types across each run
/// of tagged fields.
fn align_fields(fields: &[GoField]) -> Vec<String> {
    let name_widths = run_widths(fields, |field| field.name_cell().map(|names| names.chars().count()));
    let type_widths = run_widths(fields, |field| field.tag.as_ref().map(|_| field.ty.chars().count()));
    fields
        .iter()
        .zip(name_widths.iter().zip(&type_widths))
        .map(|(field, (name_width, type_width))| {
            let mut line = String::new();
            if let (Some(names), Some(width)) = (field.name_cell(), name_width) {
                line.push_str(&format!("{names:<width$} ", width = *width));
            }
            match (&field.tag, type_width) {
                (Some(tag), Some(width)) => line.push_str(&format!("{:<width$} `{tag}`", field.ty, width = *width)),
                _ => line.push_str(&field.ty),
            }
            line
        })
        .collect()
}

/// Widest cell of each consecutive run of fields that have one.
fn run_widths(fields: &[GoField], cell: impl Fn(&GoField) -> Option<usize>) -> Vec<Option<usize>> {
    let cells: Vec<_> = fields.iter().map(cell).collect();
    let mut widths = vec![None; cells.len()];
    let mut start = 0;
    while start < cells.len() {
        if cells[start].is_none() {
            start += 1;
            continue;
        }
        let end = cells[start..]
            .iter()
            .position(Option::is_none)
            .map_or(cells.len(), |len| start + len);
        let widest = cells[start..end].iter().flatten().copied().max();
        widths[start..end].fill(widest);
        start = end;
    }
    widths
}

/// Quotes a string the way gofmt would accept it.
pub fn go_quote(value: &str) -> String {
    let raw_safe = !value.contains('`') && !value.contains('\r');
    if (value.contains('"') || value.contains('\n')) && raw_safe {
        return format!("`{value}`");
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("\t{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

fn block(header: &str, body: &[String]) -> String {
    let mut out = format!("{header} {{\n");
    for stmt in body {
        out.push_str(&indent(stmt));
        out.push('\n');
    }
    out.push('}');
    out
}

fn join_exprs(exprs: &[GoExpr], depth: u32) -> String {
    exprs.iter().map(|expr| expr.render(depth)).collect::<Vec<_>>().join(", ")
}

/// Builds Go source text.
///
/// Remembers the package qualifier of every qualified type and called
/// function it emits, so callers can import exactly what the code uses.
#[derive(Debug, Clone, Default)]
pub struct GoSourceBuilder {
    qualifiers: RefCell<BTreeSet<String>>,
}

impl GoSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a statement list one statement per line.
    pub fn render_block(stmts: &[String]) -> String {
        stmts.join("\n")
    }

    /// Leading identifiers of dotted type names and call paths emitted so far.
    ///
    /// Local receivers such as `db.Query` show up too. Telling them apart
    /// from packages is up to the caller, which knows its own scope.
    pub fn qualifiers(&self) -> BTreeSet<String> {
        self.qualifiers.borrow().clone()
    }

    fn note_qualifier(&self, dotted: &str) {
        if let Some((head, _)) = dotted.split_once('.') {
            self.qualifiers.borrow_mut().insert(head.to_string());
        }
    }
}

impl IrBuilder for GoSourceBuilder {
    type Expr = GoExpr;
    type Stmt = String;
    type Type = String;
    type Field = GoField;
    type TypeSpec = String;
    type Decl = String;

    fn ident(&self, name: &str) -> GoExpr {
        GoExpr::Atom(name.to_string())
    }

    fn selector(&self, object: GoExpr, member: &str) -> GoExpr {
        GoExpr::Selector(object.at_least(PREC_PRIMARY), member.to_string())
    }

    fn string_lit(&self, value: &str) -> GoExpr {
        GoExpr::Atom(go_quote(value))
    }

    fn int_lit(&self, value: i64) -> GoExpr {
        GoExpr::Atom(value.to_string())
    }

    fn nil(&self) -> GoExpr {
        GoExpr::Atom("nil".to_string())
    }

    fn apply(&self, callee: GoExpr, args: Vec<GoExpr>, spread: bool) -> GoExpr {
        GoExpr::Call {
            callee: callee.at_least(PREC_PRIMARY),
            args,
            spread,
        }
    }

    fn binary(&self, op: BinaryOp, left: GoExpr, right: GoExpr) -> GoExpr {
        let prec = binary_prec(op);
        GoExpr::Binary {
            op,
            left: left.at_least(prec),
            right: right.at_least(prec + 1),
        }
    }

    fn unary(&self, op: UnaryOp, operand: GoExpr) -> GoExpr {
        GoExpr::Unary(op, operand.at_least(PREC_UNARY))
    }

    fn expr_stmt(&self, expr: GoExpr) -> String {
        expr.to_string()
    }

    fn assign(&self, targets: Vec<GoExpr>, op: AssignOp, values: Vec<GoExpr>) -> String {
        let depth = if targets.len() > 1 && values.len() > 1 { 2 } else { 1 };
        format!("{} {} {}", join_exprs(&targets, depth), op.symbol(), join_exprs(&values, depth))
    }

    fn if_stmt(&self, init: Option<String>, cond: GoExpr, body: Vec<String>) -> String {
        let header = match init {
            Some(init) => format!("if {init}; {cond}"),
            None => format!("if {cond}"),
        };
        block(&header, &body)
    }

    fn while_stmt(&self, cond: GoExpr, body: Vec<String>) -> String {
        block(&format!("for {cond}"), &body)
    }

    fn defer_stmt(&self, call: GoExpr) -> String {
        format!("defer {call}")
    }

    fn var_stmt(&self, name: &str, ty: Option<String>, value: Option<GoExpr>) -> String {
        match (ty, value) {
            (Some(ty), Some(value)) => format!("var {name} {ty} = {value}"),
            (Some(ty), None) => format!("var {name} {ty}"),
            (None, Some(value)) => format!("var {name} = {value}"),
            (None, None) => format!("var {name}"),
        }
    }

    fn return_stmt(&self, values: Vec<GoExpr>) -> String {
        if values.is_empty() {
            "return".to_string()
        } else {
            format!("return {}", join_exprs(&values, 1))
        }
    }

    fn named_type(&self, name: &str) -> String {
        self.note_qualifier(name);
        name.to_string()
    }

    fn pointer_type(&self, inner: String) -> String {
        format!("*{inner}")
    }

    fn slice_type(&self, element: String) -> String {
        format!("[]{element}")
    }

    fn field(&self, names: &[String], ty: String, tag: Option<&str>) -> GoField {
        GoField {
            names: names.to_vec(),
            ty,
            tag: tag.map(str::to_string),
        }
    }

    fn struct_spec(&self, name: &str, fields: Vec<GoField>) -> String {
        block(&format!("{name} struct"), &align_fields(&fields))
    }

    fn type_decl(&self, spec: String) -> String {
        format!("type {spec}")
    }

    fn func_decl(&self, name: &str, params: Vec<GoField>, results: Vec<GoField>, body: Vec<String>) -> String {
        let list = |fields: &[GoField]| fields.iter().map(GoField::to_string).collect::<Vec<_>>().join(", ");
        let results = match results.len() {
            0 => String::new(),
            _ => format!(" ({})", list(&results)),
        };
        block(&format!("func {name}({}){results}", list(&params)), &body)
    }

    fn path(&self, path: &str) -> GoExpr {
        self.note_qualifier(path);
        let mut segments = path.split('.');
        let head = self.ident(segments.next().unwrap_or_default());
        segments.fold(head, |object, member| self.selector(object, member))
    }
}
