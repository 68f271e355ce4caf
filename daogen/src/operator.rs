//! Comparison operators and the predicate fragments they produce.
//!
//! A [`Fragment`] is SQL text with holes for bound arguments. It is turned
//! into a target expression only at emission time, once the placeholder
//! style and the argument accumulator are known:
//!
//! - `Numbered` style: `fmt.Sprintf("age > $%d", len(args)+1)`
//! - `Question` style: `"age > ?"`

use std::fmt;
use std::str::FromStr;

use log::trace;

use crate::errors::{Result, SynthError};
use crate::ir::functions::{FMT_SPRINTF, LEN};
use crate::ir::{BinaryOp, IrBuilder};
use crate::options::PlaceholderStyle;

const COLUMN_MARKER: &str = "{column}";
const VALUE_MARKER: &str = "{value}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareOperator {
    #[default]
    Equal,
    NotEqual,
    Like,
    NotLike,
    In,
    NotIn,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    StartsWith,
    IsNull,
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 12] = [
        CompareOperator::Equal,
        CompareOperator::NotEqual,
        CompareOperator::Like,
        CompareOperator::NotLike,
        CompareOperator::In,
        CompareOperator::NotIn,
        CompareOperator::Greater,
        CompareOperator::Less,
        CompareOperator::GreaterOrEqual,
        CompareOperator::LessOrEqual,
        CompareOperator::StartsWith,
        CompareOperator::IsNull,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompareOperator::Equal => "equal",
            CompareOperator::NotEqual => "notEqual",
            CompareOperator::Like => "like",
            CompareOperator::NotLike => "notLike",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "notIn",
            CompareOperator::Greater => "greater",
            CompareOperator::Less => "less",
            CompareOperator::GreaterOrEqual => "greaterOrEqual",
            CompareOperator::LessOrEqual => "lessOrEqual",
            CompareOperator::StartsWith => "startsWith",
            CompareOperator::IsNull => "isNull",
        }
    }

    /// Operators comparing against a whole set bound as one array argument.
    pub const fn is_multi(self) -> bool {
        matches!(self, CompareOperator::In | CompareOperator::NotIn)
    }

    /// Looks up a canonical or legacy operator name. The empty name means
    /// `equal`.
    ///
    /// Usable in constants, which is how `#[derive(Record)]` rejects unknown
    /// names at compile time.
    pub const fn from_name(name: &str) -> Option<Self> {
        let mut index = 0;
        while index < OPERATOR_NAMES.len() {
            let (candidate, operator) = OPERATOR_NAMES[index];
            if str_eq(candidate, name) {
                return Some(operator);
            }
            index += 1;
        }
        None
    }

    pub fn template(self) -> OperatorTemplate {
        let (format, shape) = match self {
            CompareOperator::Equal => ("{column} = {value}", TemplateShape::Regular),
            CompareOperator::NotEqual => ("{column} != {value}", TemplateShape::Regular),
            CompareOperator::Like => ("{column} like '%' || {value} || '%'", TemplateShape::Regular),
            CompareOperator::NotLike => ("{column} not like '%' || {value} || '%'", TemplateShape::Regular),
            CompareOperator::In => ("{column} in ({value})", TemplateShape::Regular),
            CompareOperator::NotIn => ("{column} not in ({value})", TemplateShape::Regular),
            CompareOperator::Greater => ("{column} > {value}", TemplateShape::Regular),
            CompareOperator::Less => ("{column} < {value}", TemplateShape::Regular),
            CompareOperator::GreaterOrEqual => ("{column} >= {value}", TemplateShape::Regular),
            CompareOperator::LessOrEqual => ("{column} <= {value}", TemplateShape::Regular),
            CompareOperator::StartsWith => ("{column} like {value} || '%'", TemplateShape::Regular),
            CompareOperator::IsNull => ("{column} is null", TemplateShape::Inline),
        };
        OperatorTemplate { format, shape }
    }

    /// Predicate on one column bound to one caller value.
    pub fn scalar_predicate(self, column: &str, case_insensitive: bool) -> Fragment {
        let value = ValueSlot::Placeholder {
            lower: case_insensitive,
        };
        self.template().fill(&lowered(column, case_insensitive), value)
    }

    /// Predicate on one column bound to a whole array. The value is never
    /// lowered since it is not a scalar.
    pub fn array_predicate(self, column: &str, case_insensitive: bool) -> Fragment {
        self.template()
            .fill(&lowered(column, case_insensitive), ValueSlot::Placeholder { lower: false })
    }

    /// Predicate with a literal compiled into the SQL text.
    pub fn constant_predicate(self, column: &str, literal: &str, case_insensitive: bool) -> Fragment {
        self.template()
            .fill(&lowered(column, case_insensitive), ValueSlot::Literal(literal.to_string()))
    }

    /// `(c1 op v or c2 op v ...)` with every placeholder bound to the same value.
    pub fn union_predicate(self, columns: &[String], case_insensitive: bool) -> Fragment {
        self.union_with(columns, |column| self.scalar_predicate(column, case_insensitive))
    }

    /// Union predicate whose value slots all hold the same literal.
    pub fn union_constant_predicate(self, columns: &[String], literal: &str, case_insensitive: bool) -> Fragment {
        self.union_with(columns, |column| {
            self.constant_predicate(column, literal, case_insensitive)
        })
    }

    fn union_with(self, columns: &[String], mut each: impl FnMut(&str) -> Fragment) -> Fragment {
        let mut fragment = Fragment::text("(");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                fragment.push_text(" or ");
            }
            fragment.extend(each(column));
        }
        fragment.push_text(")");
        fragment
    }
}

/// Every accepted spelling, canonical names first.
const OPERATOR_NAMES: &[(&str, CompareOperator)] = &[
    ("equal", CompareOperator::Equal),
    ("notEqual", CompareOperator::NotEqual),
    ("like", CompareOperator::Like),
    ("notLike", CompareOperator::NotLike),
    ("in", CompareOperator::In),
    ("notIn", CompareOperator::NotIn),
    ("greater", CompareOperator::Greater),
    ("less", CompareOperator::Less),
    ("greaterOrEqual", CompareOperator::GreaterOrEqual),
    ("lessOrEqual", CompareOperator::LessOrEqual),
    ("startsWith", CompareOperator::StartsWith),
    ("isNull", CompareOperator::IsNull),
    ("", CompareOperator::Equal),
    ("great", CompareOperator::Greater),
    ("notLess", CompareOperator::GreaterOrEqual),
    ("notGreat", CompareOperator::LessOrEqual),
    ("starts", CompareOperator::StartsWith),
];

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut index = 0;
    while index < a.len() {
        if a[index] != b[index] {
            return false;
        }
        index += 1;
    }
    true
}

fn lowered(column: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        format!("lower({column})")
    } else {
        column.to_string()
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompareOperator {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        CompareOperator::from_name(name).ok_or_else(|| SynthError::UnknownOperator(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateShape {
    /// Column and value.
    Regular,
    /// Column only, no bound argument.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorTemplate {
    pub format: &'static str,
    pub shape: TemplateShape,
}

impl OperatorTemplate {
    pub fn fill(&self, column: &str, value: ValueSlot) -> Fragment {
        let value = match self.shape {
            TemplateShape::Regular => value,
            TemplateShape::Inline => ValueSlot::Empty,
        };
        Fragment::fill(self.format, COLUMN_MARKER, column, VALUE_MARKER, value)
    }
}

/// What goes into the value position of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSlot {
    Placeholder { lower: bool },
    Literal(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Placeholder,
}

/// SQL text with holes for bound arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pieces: Vec<Piece>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        let mut fragment = Fragment::default();
        fragment.push_text(text);
        fragment
    }

    /// Substitutes `column_marker` and `value_marker` in `template`.
    pub fn fill(template: &str, column_marker: &str, column: &str, value_marker: &str, value: ValueSlot) -> Self {
        let mut fragment = Fragment::default();
        let mut rest = template;
        loop {
            let column_at = rest.find(column_marker);
            let value_at = rest.find(value_marker);
            let (at, is_column) = match (column_at, value_at) {
                (Some(c), Some(v)) if c <= v => (c, true),
                (Some(_), Some(v)) | (None, Some(v)) => (v, false),
                (Some(c), None) => (c, true),
                (None, None) => break,
            };
            fragment.push_text(&rest[..at]);
            if is_column {
                fragment.push_text(column);
                rest = &rest[at + column_marker.len()..];
            } else {
                fragment.push_value(&value);
                rest = &rest[at + value_marker.len()..];
            }
        }
        fragment.push_text(rest);
        fragment
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.pieces.last_mut() {
            Some(Piece::Text(last)) => last.push_str(&text),
            _ => self.pieces.push(Piece::Text(text)),
        }
    }

    pub fn push_placeholder(&mut self) {
        self.pieces.push(Piece::Placeholder);
    }

    fn push_value(&mut self, value: &ValueSlot) {
        match value {
            ValueSlot::Placeholder { lower: true } => {
                self.push_text("lower(");
                self.push_placeholder();
                self.push_text(")");
            }
            ValueSlot::Placeholder { lower: false } => self.push_placeholder(),
            ValueSlot::Literal(literal) => self.push_text(literal.as_str()),
            ValueSlot::Empty => {}
        }
    }

    pub fn extend(&mut self, other: Fragment) {
        for piece in other.pieces {
            match piece {
                Piece::Text(text) => self.push_text(text),
                Piece::Placeholder => self.push_placeholder(),
            }
        }
    }

    pub fn placeholders(&self) -> usize {
        self.pieces.iter().filter(|piece| matches!(piece, Piece::Placeholder)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Number of times the bound value is appended to the argument list.
    pub fn bindings(&self, style: PlaceholderStyle) -> usize {
        match (style, self.placeholders()) {
            (_, 0) => 0,
            (PlaceholderStyle::Numbered, _) => 1,
            (PlaceholderStyle::Question, count) => count,
        }
    }

    /// Text with `?` in every hole.
    pub fn question_text(&self) -> String {
        self.render_with(|text| text.to_string(), "?")
    }

    /// `fmt.Sprintf` format string. Every hole refers to the same argument.
    pub fn numbered_format(&self) -> String {
        let token = if self.placeholders() > 1 { "$%[1]d" } else { "$%d" };
        self.render_with(|text| text.replace('%', "%%"), token)
    }

    fn render_with(&self, text: impl Fn(&str) -> String, token: &str) -> String {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(value) => text(value),
                Piece::Placeholder => token.to_string(),
            })
            .collect()
    }

    /// Plain text, for fragments without holes.
    pub fn literal_text(&self) -> String {
        self.render_with(|text| text.to_string(), "")
    }

    /// Target expression producing this fragment's SQL text at run time.
    pub fn to_expr<B: IrBuilder>(&self, b: &B, args_var: &str, style: PlaceholderStyle) -> Result<B::Expr> {
        if self.placeholders() == 0 {
            return Ok(b.string_lit(&self.literal_text()));
        }
        match style {
            PlaceholderStyle::Question => Ok(b.string_lit(&self.question_text())),
            PlaceholderStyle::Numbered => {
                let next = b.binary(BinaryOp::Add, b.call(&LEN, vec![b.ident(args_var)])?, b.int_lit(1));
                b.call(&FMT_SPRINTF, vec![b.string_lit(&self.numbered_format()), next])
            }
        }
    }
}

/// Statements appending `fragment` to `fragments_var` and its bound value
/// to `args_var`.
///
/// `value` is only used when the fragment has holes.
pub fn emit_fragment<B: IrBuilder>(
    b: &B,
    fragment: &Fragment,
    fragments_var: &str,
    args_var: &str,
    style: PlaceholderStyle,
    value: Option<B::Expr>,
) -> Result<Vec<B::Stmt>> {
    trace!(
        "emitting fragment into `{fragments_var}` with {} placeholder(s)",
        fragment.placeholders()
    );
    let mut stmts = vec![b.append_to(fragments_var, vec![fragment.to_expr(b, args_var, style)?])?];
    let bindings = fragment.bindings(style);
    if let Some(value) = value
        && bindings > 0
    {
        stmts.push(b.append_to(args_var, vec![value; bindings])?);
    }
    Ok(stmts)
}
