//! Write-path synthesis: collects column names, value fragments and bound
//! arguments for insert and update statements.

use indexmap::IndexMap;
use log::{debug, trace};

use crate::errors::{Result, SynthError};
use crate::ir::IrBuilder;
use crate::ir::functions::{IS_OMITTED, WRAPPED_VALUE_FIELD};
use crate::naming::ensure_identifier;
use crate::operator::{Fragment, ValueSlot, emit_fragment};
use crate::options::BuilderOptions;
use crate::synth::Synthesizer;
use crate::types::{FieldDescriptor, LeafField};

const COLUMN_MARKER: &str = "{column}";
const PLACEHOLDER_MARKER: &str = "{placeholder}";

/// Result of [`Synthesizer::synthesize_input_values`].
#[derive(Debug)]
pub struct InputOutput<B: IrBuilder> {
    pub statements: Vec<B::Stmt>,
    /// Empty when no field is read from the caller.
    pub shapes: IndexMap<String, B::TypeSpec>,
    pub param: Option<B::Field>,
}

/// Where a field's value comes from.
enum Origin<E> {
    Caller,
    Generated(E),
    Constant(String),
}

impl<B: IrBuilder> Synthesizer<'_, B> {
    /// Builds the value list for an insert or update. Caller-supplied fields
    /// are read from a parameter named `carrier`, which must be a plain
    /// identifier.
    pub fn synthesize_input_values(
        &self,
        fields: &[FieldDescriptor],
        carrier: &str,
        shape: &str,
        options: &BuilderOptions,
    ) -> Result<InputOutput<B>> {
        debug!("synthesizing input values for `{shape}` over {} field(s)", fields.len());
        ensure_identifier(carrier)?;
        ensure_identifier(shape)?;

        let mut statements = Vec::new();
        let mut shape_fields = Vec::new();
        for field in fields {
            let leaf = match field {
                FieldDescriptor::Leaf(leaf) => leaf,
                FieldDescriptor::Group(_) => {
                    return Err(SynthError::UnexpectedGroup {
                        context: "input values",
                    });
                }
            };
            if leaf.names.len() != 1 {
                return Err(SynthError::NameCount {
                    context: "input values",
                    found: leaf.names.len(),
                });
            }
            ensure_identifier(leaf.first_name())?;

            let origin = self.origin(leaf)?;
            if matches!(origin, Origin::Caller) {
                shape_fields.push(self.b.field(&leaf.names, self.b.resolve_type(&leaf.ty), None));
            }
            statements.extend(self.input_leaf(leaf, origin, carrier, options)?);
        }

        let mut shapes = IndexMap::new();
        let param = if shape_fields.is_empty() {
            debug!("every field of `{shape}` is omitted, no shape declared");
            None
        } else {
            shapes.insert(shape.to_string(), self.b.struct_spec(shape, shape_fields));
            Some(self.b.field(&[carrier.to_string()], self.b.named_type(shape), None))
        };
        Ok(InputOutput {
            statements,
            shapes,
            param,
        })
    }

    fn origin(&self, leaf: &LeafField) -> Result<Origin<B::Expr>> {
        if let Some(generator) = &leaf.generator {
            let descriptor = self.config.functions.resolve(generator)?;
            trace!("input field `{}` generated by `{}`", leaf.first_name(), descriptor.function);
            return Ok(Origin::Generated(self.b.call(descriptor, Vec::new())?));
        }
        if let Some(literal) = &leaf.constant {
            trace!("input field `{}` compiled in as {literal}", leaf.first_name());
            return Ok(Origin::Constant(literal.clone()));
        }
        Ok(Origin::Caller)
    }

    fn input_leaf(
        &self,
        leaf: &LeafField,
        origin: Origin<B::Expr>,
        carrier: &str,
        options: &BuilderOptions,
    ) -> Result<Vec<B::Stmt>> {
        let from_caller = matches!(origin, Origin::Caller);
        let (value, slot) = match origin {
            Origin::Caller => (Some(self.caller_value(leaf, carrier)?), ValueSlot::Placeholder { lower: false }),
            Origin::Generated(value) => (Some(value), ValueSlot::Placeholder { lower: false }),
            Origin::Constant(literal) => (None, ValueSlot::Literal(literal)),
        };
        let mut body = self.emit_input(leaf, value, slot, options)?;
        if !from_caller {
            return Ok(body);
        }

        let field = self.carrier_field(carrier, leaf.first_name());
        if leaf.maybe {
            let omitted = self.b.method_call(field.clone(), &IS_OMITTED, Vec::new())?;
            body = vec![self.b.if_stmt(None, self.b.not(omitted), body)];
        }
        if leaf.is_pointer() {
            body = vec![self.b.if_stmt(None, self.b.not_nil(field), body)];
        }
        Ok(body)
    }

    /// Value bound for a caller-supplied field.
    fn caller_value(&self, leaf: &LeafField, carrier: &str) -> Result<B::Expr> {
        let field = self.carrier_field(carrier, leaf.first_name());
        if leaf.encrypted {
            let mut raw = field;
            if leaf.is_pointer() {
                raw = self.b.deref(raw);
            }
            if leaf.maybe {
                raw = self.b.selector(raw, WRAPPED_VALUE_FIELD);
            }
            return self.b.call(self.config.encryption.current(), vec![raw]);
        }
        if leaf.custom && !leaf.is_pointer() {
            return Ok(self.b.address_of(field));
        }
        Ok(field)
    }

    fn emit_input(
        &self,
        leaf: &LeafField,
        value: Option<B::Expr>,
        slot: ValueSlot,
        options: &BuilderOptions,
    ) -> Result<Vec<B::Stmt>> {
        let column = leaf.source.sql_expr();
        let mut stmts = Vec::new();
        if let Some(columns_var) = &options.columns_var {
            stmts.push(self.b.append_to(columns_var, vec![self.b.string_lit(&column)])?);
        }
        if options.value_format.is_empty() {
            if let Some(value) = value {
                stmts.push(self.b.append_to(&options.values_var, vec![value])?);
            }
            return Ok(stmts);
        }
        let fragment = Fragment::fill(&options.value_format, COLUMN_MARKER, &column, PLACEHOLDER_MARKER, slot);
        stmts.extend(emit_fragment(
            self.b,
            &fragment,
            &options.fragments_var,
            &options.values_var,
            options.placeholder,
            value,
        )?);
        Ok(stmts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeRef;
    use crate::ir::model::ModelBuilder;
    use crate::ir::source::GoSourceBuilder;
    use crate::ir::CallDescriptor;
    use crate::registry::SynthConfig;
    use pretty_assertions::assert_eq;

    fn go_input(fields: &[FieldDescriptor], options: &BuilderOptions, config: &SynthConfig) -> InputOutput<GoSourceBuilder> {
        let b = GoSourceBuilder::new();
        Synthesizer::new(&b, config)
            .synthesize_input_values(fields, "opts", "InsertOptions", options)
            .unwrap()
    }

    #[test]
    fn encrypted_custom_field_goes_through_hook() {
        let password = LeafField::new("Password", TypeRef::named("Password")).custom().encrypted();
        let out = go_input(&[password.into()], &BuilderOptions::insert(), &SynthConfig::new());
        assert_eq!(
            out.statements,
            vec![
                "fields = append(fields, \"password\")".to_string(),
                "values = append(values, fmt.Sprintf(\"/* password */ $%d\", len(args)+1))".to_string(),
                "args = append(args, encryptPassword(opts.Password))".to_string(),
            ]
        );
    }

    #[test]
    fn registered_hook_replaces_default() {
        let config = SynthConfig::new()
            .with_encryption(CallDescriptor::fixed("crypto.Seal", 1))
            .unwrap();
        let secret = LeafField::new("Secret", TypeRef::pointer(TypeRef::named("string"))).encrypted();
        let out = go_input(&[secret.into()], &BuilderOptions::incoming_arguments(), &config);
        assert_eq!(
            out.statements.join("\n"),
            "if opts.Secret != nil {\n\targs = append(args, crypto.Seal(*opts.Secret))\n}"
        );
    }

    #[test]
    fn pointer_guard_wraps_wrapper_guard() {
        let note = LeafField::new("Note", TypeRef::pointer(TypeRef::named("Maybe")))
            .maybe()
            .encrypted();
        let out = go_input(&[note.into()], &BuilderOptions::update(), &SynthConfig::new());
        assert_eq!(
            out.statements.join("\n"),
            "if opts.Note != nil {\n\
             \tif !opts.Note.IsOmitted() {\n\
             \t\tfields = append(fields, fmt.Sprintf(\"note = $%d\", len(args)+1))\n\
             \t\targs = append(args, encryptPassword((*opts.Note).Value))\n\
             \t}\n\
             }"
        );
    }

    #[test]
    fn custom_value_passes_address() {
        let point = LeafField::new("Location", TypeRef::named("geo.Point")).custom();
        let out = go_input(&[point.into()], &BuilderOptions::incoming_arguments(), &SynthConfig::new());
        assert_eq!(out.statements, vec!["args = append(args, &opts.Location)".to_string()]);
    }

    #[test]
    fn omitted_fields_skip_the_shape() {
        let fields = vec![
            LeafField::new("CreatedAt", TypeRef::named("time.Time")).generator("now").into(),
            LeafField::new("Status", TypeRef::named("string")).constant("'new'").into(),
            LeafField::new("Name", TypeRef::named("string")).into(),
        ];
        let out = go_input(&fields, &BuilderOptions::insert(), &SynthConfig::new());
        assert_eq!(
            out.statements,
            vec![
                "fields = append(fields, \"created_at\")".to_string(),
                "values = append(values, fmt.Sprintf(\"/* created_at */ $%d\", len(args)+1))".to_string(),
                "args = append(args, time.Now())".to_string(),
                "fields = append(fields, \"status\")".to_string(),
                "values = append(values, \"/* status */ 'new'\")".to_string(),
                "fields = append(fields, \"name\")".to_string(),
                "values = append(values, fmt.Sprintf(\"/* name */ $%d\", len(args)+1))".to_string(),
                "args = append(args, opts.Name)".to_string(),
            ]
        );
        assert_eq!(out.shapes["InsertOptions"], "InsertOptions struct {\n\tName string\n}");
        assert_eq!(out.param.map(|param| param.to_string()).as_deref(), Some("opts InsertOptions"));
    }

    #[test]
    fn all_omitted_means_no_shape() {
        let fields = vec![LeafField::new("UpdatedAt", TypeRef::named("time.Time")).generator("now").into()];
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let out = Synthesizer::new(&b, &config)
            .synthesize_input_values(&fields, "opts", "Q", &BuilderOptions::update())
            .unwrap();
        assert!(out.shapes.is_empty());
        assert!(out.param.is_none());
        assert!(out.statements.iter().all(|stmt| !stmt.mentions("opts")));
    }

    #[test]
    fn rejects_groups_and_unknown_generators() {
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let synth = Synthesizer::new(&b, &config);
        let err = synth
            .synthesize_input_values(&[FieldDescriptor::Group(vec![])], "opts", "Q", &BuilderOptions::insert())
            .unwrap_err();
        assert_eq!(err, SynthError::UnexpectedGroup { context: "input values" });

        let field = LeafField::new("Id", TypeRef::named("string")).generator("uuid7");
        let err = synth
            .synthesize_input_values(&[field.into()], "opts", "Q", &BuilderOptions::insert())
            .unwrap_err();
        assert_eq!(err, SynthError::UnknownGenerator("uuid7".into()));
    }

    #[test]
    fn carrier_must_be_a_plain_identifier() {
        let config = SynthConfig::new();
        let b = ModelBuilder::new();
        let name = LeafField::new("Name", TypeRef::named("string"));
        let err = Synthesizer::new(&b, &config)
            .synthesize_input_values(&[name.into()], "req.opts", "Q", &BuilderOptions::insert())
            .unwrap_err();
        assert_eq!(err, SynthError::InvalidIdentifier("req.opts".into()));
    }

    #[test]
    fn constant_without_format_adds_nothing() {
        let fields = vec![LeafField::new("Kind", TypeRef::named("string")).constant("'a'").into()];
        let out = go_input(&fields, &BuilderOptions::incoming_arguments(), &SynthConfig::new());
        assert!(out.statements.is_empty());
    }
}
