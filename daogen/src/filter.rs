//! Read-path synthesis: turns field metadata into `where` fragments.
//!
//! Each leaf appends one fragment to the accumulator and binds its value.
//! Groups recurse into their own accumulator, and the joined result is
//! appended to the parent as a single parenthesized fragment:
//!
//! ```text
//! var filters_1 []string
//! ...
//! if len(filters_1) > 0 {
//!     filters = append(filters, "("+strings.Join(filters_1, " or ")+")")
//! }
//! ```
//!
//! The argument accumulator is shared, so numbering continues across groups.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::errors::{Result, SynthError};
use crate::ir::functions::{LEN, STRINGS_JOIN};
use crate::ir::{BinaryOp, IrBuilder, TypeRef, sql_array_type};
use crate::naming::ensure_identifier;
use crate::operator::{Fragment, emit_fragment};
use crate::options::BuilderOptions;
use crate::synth::Synthesizer;
use crate::types::{FieldDescriptor, LeafField};

/// Result of [`Synthesizer::synthesize_filter`].
#[derive(Debug)]
pub struct FilterOutput<B: IrBuilder> {
    pub statements: Vec<B::Stmt>,
    /// Option shapes keyed by type name, the top-level shape first.
    pub shapes: IndexMap<String, B::TypeSpec>,
    /// Parameter receiving the top-level shape.
    pub param: B::Field,
}

struct Level<'s> {
    carrier: String,
    shape: String,
    fragments_var: String,
    options: &'s BuilderOptions,
}

impl<B: IrBuilder> Synthesizer<'_, B> {
    /// Builds the filter statements for `fields`, read from a parameter
    /// named `carrier` of type `shape`.
    ///
    /// `carrier` becomes the Go parameter name, so it must be a plain
    /// identifier: `req.opts` is rejected with
    /// [`SynthError::InvalidIdentifier`]. Groups reach their members through
    /// dotted paths built from it.
    pub fn synthesize_filter(
        &self,
        fields: &[FieldDescriptor],
        carrier: &str,
        shape: &str,
        options: &BuilderOptions,
    ) -> Result<FilterOutput<B>> {
        debug!("synthesizing filter `{shape}` over {} field(s)", fields.len());
        ensure_identifier(carrier)?;
        ensure_identifier(shape)?;
        ensure_identifier(&options.fragments_var)?;
        ensure_identifier(&options.values_var)?;

        let level = Level {
            carrier: carrier.to_string(),
            shape: shape.to_string(),
            fragments_var: options.fragments_var.clone(),
            options,
        };
        let mut shapes = IndexMap::new();
        let statements = self.filter_level(fields, &level, &mut shapes)?;
        debug!(
            "filter `{shape}` declared shapes: {}",
            shapes.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        );
        Ok(FilterOutput {
            statements,
            shapes,
            param: self.b.field(&[carrier.to_string()], self.b.named_type(shape), None),
        })
    }

    fn filter_level(
        &self,
        fields: &[FieldDescriptor],
        level: &Level<'_>,
        shapes: &mut IndexMap<String, B::TypeSpec>,
    ) -> Result<Vec<B::Stmt>> {
        // Reserve the slot so the parent precedes its groups.
        let position = shapes.len();
        let mut statements = Vec::new();
        let mut shape_fields = Vec::new();
        let mut taken: HashSet<String> = fields
            .iter()
            .filter_map(FieldDescriptor::as_leaf)
            .flat_map(|leaf| leaf.names.iter().cloned())
            .collect();

        for (index, field) in fields.iter().enumerate() {
            match field {
                FieldDescriptor::Leaf(leaf) => {
                    let (stmts, shape_field) = self.filter_leaf(leaf, level)?;
                    statements.extend(stmts);
                    shape_fields.extend(shape_field);
                }
                FieldDescriptor::Group(members) => {
                    let member = group_field_name(field, index, &mut taken);
                    let child = Level {
                        carrier: format!("{}.{member}", level.carrier),
                        shape: format!("{}Group{index}", level.shape),
                        fragments_var: format!("{}_{index}", level.fragments_var),
                        options: level.options,
                    };
                    trace!("group `{member}` at index {index} uses `{}`", child.fragments_var);
                    let body = self.filter_level(members, &child, shapes)?;
                    if !body.is_empty() {
                        let string_slice = self.b.slice_type(self.b.named_type("string"));
                        statements.push(self.b.var_stmt(&child.fragments_var, Some(string_slice), None));
                        statements.extend(body);
                        statements.push(self.join_group(&level.fragments_var, &child.fragments_var)?);
                    }
                    shape_fields.push(self.b.field(&[member], self.b.named_type(&child.shape), None));
                }
            }
        }

        let spec = self.b.struct_spec(&level.shape, shape_fields);
        shapes.shift_insert(position, level.shape.clone(), spec);
        Ok(statements)
    }

    /// Statements for one leaf, and its field in the option shape unless the
    /// value is compiled in.
    fn filter_leaf(&self, leaf: &LeafField, level: &Level<'_>) -> Result<(Vec<B::Stmt>, Option<B::Field>)> {
        if leaf.names.len() != 1 {
            return Err(SynthError::NameCount {
                context: "filter",
                found: leaf.names.len(),
            });
        }
        let name = leaf.first_name();
        ensure_identifier(name)?;

        let union = leaf.source.union_columns();
        if union.is_some() && leaf.is_multi() {
            return Err(SynthError::OperatorShapeConflict {
                field: name.to_string(),
                operator: leaf.operator.to_string(),
            });
        }

        let options = level.options;
        let operator = leaf.operator;
        let column = leaf.source.sql_expr();

        if let Some(literal) = &leaf.constant {
            trace!("filter field `{name}` compiled in as {literal}");
            let fragment = match union {
                Some(columns) => operator.union_constant_predicate(columns, literal, leaf.case_insensitive),
                None => operator.constant_predicate(&column, literal, leaf.case_insensitive),
            };
            let stmts = emit_fragment(
                self.b,
                &fragment,
                &level.fragments_var,
                &options.values_var,
                options.placeholder,
                None,
            )?;
            return Ok((stmts, None));
        }

        let shape_field = self.b.field(&leaf.names, self.b.resolve_type(&leaf.ty), None);
        let value = self.carrier_field(&level.carrier, name);
        let stmts = if let Some(columns) = union {
            trace!("filter field `{name}` matches any of {columns:?}");
            let fragment = operator.union_predicate(columns, leaf.case_insensitive);
            self.guarded_predicate(leaf, &fragment, level, value)?
        } else if leaf.is_multi() {
            trace!("filter field `{name}` binds an array");
            let fragment = operator.array_predicate(&column, leaf.case_insensitive);
            let value = self.array_argument(&leaf.ty, value);
            emit_fragment(
                self.b,
                &fragment,
                &level.fragments_var,
                &options.values_var,
                options.placeholder,
                Some(value),
            )?
        } else {
            let fragment = operator.scalar_predicate(&column, leaf.case_insensitive);
            self.guarded_predicate(leaf, &fragment, level, value)?
        };
        Ok((stmts, Some(shape_field)))
    }

    /// Emits the predicate, inside a nil check when the field is a pointer.
    fn guarded_predicate(
        &self,
        leaf: &LeafField,
        fragment: &Fragment,
        level: &Level<'_>,
        value: B::Expr,
    ) -> Result<Vec<B::Stmt>> {
        let options = level.options;
        if !leaf.is_pointer() {
            return emit_fragment(
                self.b,
                fragment,
                &level.fragments_var,
                &options.values_var,
                options.placeholder,
                Some(value),
            );
        }
        let cond = self.b.not_nil(value.clone());
        let body = emit_fragment(
            self.b,
            fragment,
            &level.fragments_var,
            &options.values_var,
            options.placeholder,
            Some(self.b.deref(value)),
        )?;
        Ok(vec![self.b.if_stmt(None, cond, body)])
    }

    /// Converts a slice to its named array alias when one exists.
    fn array_argument(&self, ty: &TypeRef, value: B::Expr) -> B::Expr {
        if let TypeRef::Slice(element) = ty
            && let TypeRef::Named(alias) = sql_array_type(element)
        {
            return self.b.apply(self.b.ident(&alias), vec![value], false);
        }
        value
    }

    fn join_group(&self, parent: &str, child: &str) -> Result<B::Stmt> {
        let b = self.b;
        let cond = b.binary(BinaryOp::Greater, b.call(&LEN, vec![b.ident(child)])?, b.int_lit(0));
        let joined = b.call(&STRINGS_JOIN, vec![b.ident(child), b.string_lit(" or ")])?;
        let wrapped = b.binary(
            BinaryOp::Add,
            b.binary(BinaryOp::Add, b.string_lit("("), joined),
            b.string_lit(")"),
        );
        Ok(b.if_stmt(None, cond, vec![b.append_to(parent, vec![wrapped])?]))
    }
}

/// `Sub` followed by the distinct leaf names of the group. The index is
/// appended when that is empty or already used in the parent shape.
fn group_field_name(group: &FieldDescriptor, index: usize, taken: &mut HashSet<String>) -> String {
    let mut seen = HashSet::new();
    let mut name = String::from("Sub");
    for leaf_name in group.leaf_names() {
        if seen.insert(leaf_name) {
            name.push_str(leaf_name);
        }
    }
    if name == "Sub" || taken.contains(&name) {
        name.push_str(&index.to_string());
    }
    taken.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{Expr, ModelBuilder, Stmt};
    use crate::ir::source::GoSourceBuilder;
    use crate::operator::CompareOperator;
    use crate::options::PlaceholderStyle;
    use crate::registry::SynthConfig;
    use pretty_assertions::assert_eq;

    fn string_field(name: &str) -> FieldDescriptor {
        LeafField::new(name, TypeRef::named("string")).into()
    }

    fn go_filter(fields: &[FieldDescriptor]) -> FilterOutput<GoSourceBuilder> {
        let config = SynthConfig::new();
        let b = GoSourceBuilder::new();
        Synthesizer::new(&b, &config)
            .synthesize_filter(fields, "opts", "FindOptions", &BuilderOptions::find())
            .unwrap()
    }

    #[test]
    fn scalar_field_is_unconditional() {
        let out = go_filter(&[string_field("Name")]);
        assert_eq!(
            out.statements,
            vec![
                "filters = append(filters, fmt.Sprintf(\"name = $%d\", len(args)+1))".to_string(),
                "args = append(args, opts.Name)".to_string(),
            ]
        );
        assert_eq!(out.param.to_string(), "opts FindOptions");
        assert_eq!(out.shapes["FindOptions"], "FindOptions struct {\n\tName string\n}");
    }

    #[test]
    fn pointer_field_is_guarded_and_dereferenced() {
        let age = LeafField::new("Age", TypeRef::pointer(TypeRef::named("int64"))).operator(CompareOperator::Greater);
        let out = go_filter(&[age.into()]);
        assert_eq!(
            out.statements.join("\n"),
            "if opts.Age != nil {\n\
             \tfilters = append(filters, fmt.Sprintf(\"age > $%d\", len(args)+1))\n\
             \targs = append(args, *opts.Age)\n\
             }"
        );
    }

    #[test]
    fn group_joins_members_with_or() {
        let fields = vec![
            string_field("C"),
            FieldDescriptor::Group(vec![string_field("A"), string_field("B")]),
        ];
        let out = go_filter(&fields);
        assert_eq!(
            out.statements,
            vec![
                "filters = append(filters, fmt.Sprintf(\"c = $%d\", len(args)+1))".to_string(),
                "args = append(args, opts.C)".to_string(),
                "var filters_1 []string".to_string(),
                "filters_1 = append(filters_1, fmt.Sprintf(\"a = $%d\", len(args)+1))".to_string(),
                "args = append(args, opts.SubAB.A)".to_string(),
                "filters_1 = append(filters_1, fmt.Sprintf(\"b = $%d\", len(args)+1))".to_string(),
                "args = append(args, opts.SubAB.B)".to_string(),
                "if len(filters_1) > 0 {\n\
                 \tfilters = append(filters, \"(\"+strings.Join(filters_1, \" or \")+\")\")\n\
                 }"
                .to_string(),
            ]
        );
        assert_eq!(out.shapes.keys().collect::<Vec<_>>(), vec!["FindOptions", "FindOptionsGroup1"]);
        assert_eq!(
            out.shapes["FindOptions"],
            "FindOptions struct {\n\tC     string\n\tSubAB FindOptionsGroup1\n}"
        );
        assert_eq!(
            out.shapes["FindOptionsGroup1"],
            "FindOptionsGroup1 struct {\n\tA string\n\tB string\n}"
        );
    }

    #[test]
    fn leaf_after_a_group_binds_last() {
        let fields = vec![
            string_field("X"),
            FieldDescriptor::Group(vec![string_field("A"), string_field("B")]),
            string_field("Y"),
        ];
        let config = SynthConfig::new();
        let b = GoSourceBuilder::new();
        for (style, fragment) in [
            (
                PlaceholderStyle::Numbered,
                "filters = append(filters, fmt.Sprintf(\"y = $%d\", len(args)+1))",
            ),
            (PlaceholderStyle::Question, "filters = append(filters, \"y = ?\")"),
        ] {
            let options = BuilderOptions::find().with_placeholder_style(style);
            let out = Synthesizer::new(&b, &config)
                .synthesize_filter(&fields, "opts", "FindOptions", &options)
                .unwrap();
            let last = out.statements.len() - 1;
            assert!(out.statements[last - 2].starts_with("if len(filters_1) > 0 {"));
            assert_eq!(out.statements[last - 1], fragment);
            assert_eq!(out.statements[last], "args = append(args, opts.Y)");

            let binds: Vec<_> = out
                .statements
                .iter()
                .filter(|stmt| stmt.starts_with("args = "))
                .map(String::as_str)
                .collect();
            assert_eq!(
                binds,
                vec![
                    "args = append(args, opts.X)",
                    "args = append(args, opts.SubAB.A)",
                    "args = append(args, opts.SubAB.B)",
                    "args = append(args, opts.Y)",
                ]
            );
        }
    }

    #[test]
    fn carrier_must_be_a_plain_identifier() {
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let err = Synthesizer::new(&b, &config)
            .synthesize_filter(&[string_field("Name")], "req.opts", "FindOptions", &BuilderOptions::find())
            .unwrap_err();
        assert_eq!(err, SynthError::InvalidIdentifier("req.opts".into()));
    }

    #[test]
    fn nested_groups_get_distinct_names() {
        let fields = vec![
            FieldDescriptor::Group(vec![
                string_field("A"),
                FieldDescriptor::Group(vec![string_field("B"), string_field("C")]),
            ]),
            FieldDescriptor::Group(vec![string_field("A")]),
        ];
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let out = Synthesizer::new(&b, &config)
            .synthesize_filter(&fields, "opts", "Q", &BuilderOptions::find())
            .unwrap();
        let names: Vec<_> = out.shapes.keys().cloned().collect();
        assert_eq!(names, vec!["Q", "QGroup0", "QGroup0Group1", "QGroup1"]);
        let top = out.shapes["Q"].field_names();
        assert_eq!(top, vec!["SubABC", "SubA"]);
        assert!(out.statements.iter().any(|stmt| matches!(stmt, Stmt::Var { name, .. } if name == "filters_0_1")));
    }

    #[test]
    fn clashing_group_name_takes_index() {
        let fields = vec![
            FieldDescriptor::Group(vec![string_field("A")]),
            FieldDescriptor::Group(vec![string_field("A")]),
            FieldDescriptor::Group(vec![]),
        ];
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let out = Synthesizer::new(&b, &config)
            .synthesize_filter(&fields, "opts", "Q", &BuilderOptions::find())
            .unwrap();
        assert_eq!(out.shapes["Q"].field_names(), vec!["SubA", "SubA1", "Sub2"]);
    }

    #[test]
    fn multi_value_is_never_guarded() {
        let tags = LeafField::new("Tags", TypeRef::slice(TypeRef::named("string"))).operator(CompareOperator::In);
        let out = go_filter(&[tags.into()]);
        assert_eq!(
            out.statements,
            vec![
                "filters = append(filters, fmt.Sprintf(\"tags in ($%d)\", len(args)+1))".to_string(),
                "args = append(args, SqlStringArray(opts.Tags))".to_string(),
            ]
        );
    }

    #[test]
    fn multi_value_pointer_is_still_unguarded() {
        let ids = LeafField::new("Ids", TypeRef::pointer(TypeRef::slice(TypeRef::named("int64"))))
            .operator(CompareOperator::NotIn);
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let out = Synthesizer::new(&b, &config)
            .synthesize_filter(&[ids.into()], "opts", "Q", &BuilderOptions::find())
            .unwrap();
        assert!(out.statements.iter().all(|stmt| !stmt.is_guard()));
    }

    #[test]
    fn constant_never_reads_the_carrier() {
        let status = LeafField::new("Status", TypeRef::named("string")).constant("'active'");
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let out = Synthesizer::new(&b, &config)
            .synthesize_filter(&[status.into()], "opts", "Q", &BuilderOptions::find())
            .unwrap();
        assert_eq!(out.statements.len(), 1);
        assert!(out.statements.iter().all(|stmt| !stmt.mentions("opts")));
        assert!(out.shapes["Q"].fields.is_empty());
        assert!(matches!(
            &out.statements[0],
            Stmt::Assign { values, .. } if matches!(&values[0], Expr::Call { args, .. } if args[1] == Expr::Str("status = 'active'".into()))
        ));
    }

    #[test]
    fn union_columns_share_one_argument() {
        let login = LeafField::new("Login", TypeRef::pointer(TypeRef::named("string")))
            .any_of(["email", "username"])
            .case_insensitive();
        let out = go_filter(&[login.into()]);
        assert_eq!(
            out.statements.join("\n"),
            "if opts.Login != nil {\n\
             \tfilters = append(filters, fmt.Sprintf(\"(lower(email) = lower($%[1]d) or lower(username) = lower($%[1]d))\", len(args)+1))\n\
             \targs = append(args, *opts.Login)\n\
             }"
        );
    }

    #[test]
    fn question_placeholders_bind_union_per_column() {
        let login = LeafField::new("Login", TypeRef::named("string")).any_of(["email", "username"]);
        let config = SynthConfig::new();
        let b = GoSourceBuilder::new();
        let options = BuilderOptions::find().with_placeholder_style(PlaceholderStyle::Question);
        let out = Synthesizer::new(&b, &config)
            .synthesize_filter(&[login.into()], "opts", "Q", &options)
            .unwrap();
        assert_eq!(
            out.statements,
            vec![
                "filters = append(filters, \"(email = ? or username = ?)\")".to_string(),
                "args = append(args, opts.Login, opts.Login)".to_string(),
            ]
        );
    }

    #[test]
    fn union_with_multi_value_is_rejected() {
        let field = LeafField::new("Ids", TypeRef::slice(TypeRef::named("int64")))
            .any_of(["a", "b"])
            .operator(CompareOperator::In);
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let err = Synthesizer::new(&b, &config)
            .synthesize_filter(&[field.into()], "opts", "Q", &BuilderOptions::find())
            .unwrap_err();
        assert_eq!(
            err,
            SynthError::OperatorShapeConflict {
                field: "Ids".into(),
                operator: "in".into()
            }
        );
    }

    #[test]
    fn empty_inputs_declare_empty_shapes() {
        let out = go_filter(&[]);
        assert!(out.statements.is_empty());
        assert_eq!(out.shapes.len(), 1);
        assert_eq!(out.shapes["FindOptions"], "FindOptions struct {\n}");

        let out = go_filter(&[FieldDescriptor::Group(Vec::new())]);
        assert!(out.statements.is_empty());
        assert_eq!(out.shapes["FindOptions"], "FindOptions struct {\n\tSub0 FindOptionsGroup0\n}");
        assert_eq!(out.shapes["FindOptionsGroup0"], "FindOptionsGroup0 struct {\n}");
    }

    #[test]
    fn leaf_needs_exactly_one_name() {
        let field = LeafField::new("A", TypeRef::named("string")).also_named("B");
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let err = Synthesizer::new(&b, &config)
            .synthesize_filter(&[field.into()], "opts", "Q", &BuilderOptions::find())
            .unwrap_err();
        assert_eq!(err, SynthError::NameCount { context: "filter", found: 2 });
    }
}
