use heck::ToSnakeCase;

use crate::ir::TypeRef;
use crate::operator::CompareOperator;

/// Where a field's value lives on the SQL side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSql {
    Column(String),
    /// Raw SQL expression, used verbatim in place of a column.
    Expression(String),
    /// Any of these columns may match the value.
    AnyOf(Vec<String>),
}

impl SourceSql {
    /// SQL text that stands for this source in a select list or predicate.
    pub fn sql_expr(&self) -> String {
        match self {
            SourceSql::Column(column) | SourceSql::Expression(column) => column.clone(),
            SourceSql::AnyOf(columns) => columns.join(", "),
        }
    }

    pub fn union_columns(&self) -> Option<&[String]> {
        match self {
            SourceSql::AnyOf(columns) if columns.len() > 1 => Some(columns),
            _ => None,
        }
    }
}

/// One field of a record, with everything needed to read or write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafField {
    pub names: Vec<String>,
    pub ty: TypeRef,
    pub source: SourceSql,
    pub operator: CompareOperator,
    pub case_insensitive: bool,
    /// Value is an optional wrapper exposing `IsOmitted()` and `Value`.
    pub maybe: bool,
    /// Value is a custom type passed to the driver by address.
    pub custom: bool,
    pub encrypted: bool,
    /// Literal compiled into the SQL text instead of a caller value.
    pub constant: Option<String>,
    /// Registered generator producing the value on write paths.
    pub generator: Option<String>,
}

impl LeafField {
    /// Field reading column `snake_case(name)` with the `equal` operator.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        Self {
            source: SourceSql::Column(name.to_snake_case()),
            names: vec![name],
            ty,
            operator: CompareOperator::Equal,
            case_insensitive: false,
            maybe: false,
            custom: false,
            encrypted: false,
            constant: None,
            generator: None,
        }
    }

    pub fn also_named(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.source = SourceSql::Column(column.into());
        self
    }

    pub fn expression(mut self, expr: impl Into<String>) -> Self {
        self.source = SourceSql::Expression(expr.into());
        self
    }

    pub fn any_of<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = SourceSql::AnyOf(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn operator(mut self, operator: CompareOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn maybe(mut self) -> Self {
        self.maybe = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn constant(mut self, literal: impl Into<String>) -> Self {
        self.constant = Some(literal.into());
        self
    }

    pub fn generator(mut self, name: impl Into<String>) -> Self {
        self.generator = Some(name.into());
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.ty.is_pointer()
    }

    pub fn is_multi(&self) -> bool {
        self.operator.is_multi()
    }

    pub fn first_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    Leaf(LeafField),
    /// Members combined with `or`.
    Group(Vec<FieldDescriptor>),
}

impl FieldDescriptor {
    pub fn as_leaf(&self) -> Option<&LeafField> {
        match self {
            FieldDescriptor::Leaf(leaf) => Some(leaf),
            FieldDescriptor::Group(_) => None,
        }
    }

    /// Leaf names reachable from this descriptor, in declaration order.
    pub fn leaf_names(&self) -> Vec<&str> {
        match self {
            FieldDescriptor::Leaf(leaf) => leaf.names.iter().map(String::as_str).collect(),
            FieldDescriptor::Group(members) => members.iter().flat_map(FieldDescriptor::leaf_names).collect(),
        }
    }
}

impl From<LeafField> for FieldDescriptor {
    fn from(leaf: LeafField) -> Self {
        FieldDescriptor::Leaf(leaf)
    }
}

/// Record type whose fields drive synthesis.
///
/// Usually implemented through `#[derive(Record)]`.
pub trait Record {
    /// Go type name of the record.
    const NAME: &'static str;
    const TABLE: &'static str;

    fn fields() -> Vec<FieldDescriptor>;
}
