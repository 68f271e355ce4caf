use heck::ToUpperCamelCase;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Error, Field, LitStr, Result};

use super::go_type::GoType;

enum Source {
    Column(String),
    Expression(String),
    AnyOf(Vec<String>),
}

pub(crate) struct ParsedField {
    go_name: String,
    ty: GoType,
    source: Source,
    /// Operator name as written, resolved against `CompareOperator`'s table
    /// at compile time of the deriving crate.
    operator: Option<LitStr>,
    case_insensitive: bool,
    maybe: bool,
    custom: bool,
    encrypt: bool,
    constant: Option<String>,
    generate: Option<String>,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Record requires named fields"))?;
        let rust_name = ident.to_string();
        let rust_name = rust_name.strip_prefix("r#").unwrap_or(&rust_name).to_string();

        let mut go_name: Option<String> = None;
        let mut go_type: Option<GoType> = None;
        let mut source: Option<Source> = None;
        let mut operator: Option<LitStr> = None;
        let mut case_insensitive = false;
        let mut maybe = false;
        let mut custom = false;
        let mut encrypt = false;
        let mut constant: Option<String> = None;
        let mut generate: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("daogen") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") || meta.path.is_ident("expr") {
                    if source.is_some() {
                        return Err(meta.error("column, expr and any_of are mutually exclusive"));
                    }
                    let value: LitStr = meta.value()?.parse()?;
                    source = Some(if meta.path.is_ident("column") {
                        Source::Column(value.value())
                    } else {
                        Source::Expression(value.value())
                    });
                } else if meta.path.is_ident("any_of") {
                    if source.is_some() {
                        return Err(meta.error("column, expr and any_of are mutually exclusive"));
                    }
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let columns: Vec<String> = content
                        .parse_terminated(|input| input.parse::<LitStr>(), syn::Token![,])?
                        .into_iter()
                        .map(|lit| lit.value())
                        .collect();
                    if columns.len() < 2 {
                        return Err(meta.error("any_of requires at least two columns"));
                    }
                    source = Some(Source::AnyOf(columns));
                } else if meta.path.is_ident("op") {
                    operator = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("case_insensitive") {
                    case_insensitive = true;
                } else if meta.path.is_ident("maybe") {
                    maybe = true;
                } else if meta.path.is_ident("custom") {
                    custom = true;
                } else if meta.path.is_ident("encrypt") {
                    encrypt = true;
                } else if meta.path.is_ident("constant") {
                    let value: LitStr = meta.value()?.parse()?;
                    constant = Some(value.value());
                } else if meta.path.is_ident("generate") {
                    let value: LitStr = meta.value()?.parse()?;
                    generate = Some(value.value());
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    go_name = Some(value.value());
                } else if meta.path.is_ident("go_type") {
                    let value: LitStr = meta.value()?.parse()?;
                    go_type = Some(GoType::parse(&value.value()));
                } else {
                    return Err(meta.error(
                        "unknown field attribute, expected column, expr, any_of, op, case_insensitive, maybe, \
                         custom, encrypt, constant, generate, name, or go_type",
                    ));
                }
                Ok(())
            })?;
        }

        let ty = match go_type {
            Some(ty) => ty,
            None => GoType::from_rust(&field.ty)?,
        };
        if constant.is_some() && generate.is_some() {
            return Err(Error::new_spanned(ident, "constant and generate are mutually exclusive"));
        }

        Ok(Self {
            go_name: go_name.unwrap_or_else(|| rust_name.to_upper_camel_case()),
            source: source.unwrap_or(Source::Column(rust_name)),
            ty,
            operator,
            case_insensitive,
            maybe,
            custom,
            encrypt,
            constant,
            generate,
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let go_name = &self.go_name;
        let ty = &self.ty;
        let operator = self.operator();

        let source = match &self.source {
            Source::Column(column) => quote! { .column(#column) },
            Source::Expression(expr) => quote! { .expression(#expr) },
            Source::AnyOf(columns) => quote! { .any_of([#(#columns),*]) },
        };
        let case_insensitive = self.case_insensitive.then(|| quote! { .case_insensitive() });
        let maybe = self.maybe.then(|| quote! { .maybe() });
        let custom = self.custom.then(|| quote! { .custom() });
        let encrypt = self.encrypt.then(|| quote! { .encrypted() });
        let constant = self.constant.as_ref().map(|literal| quote! { .constant(#literal) });
        let generate = self.generate.as_ref().map(|name| quote! { .generator(#name) });

        quote! {
            ::daogen::FieldDescriptor::Leaf(
                ::daogen::LeafField::new(#go_name, #ty)
                    #source
                    .operator(#operator)
                    #case_insensitive
                    #maybe
                    #custom
                    #encrypt
                    #constant
                    #generate
            )
        }
    }

    /// Resolves the operator in a constant so unknown names and invalid
    /// combinations fail the build.
    fn operator(&self) -> TokenStream2 {
        let Some(name) = &self.operator else {
            return quote! { ::daogen::CompareOperator::Equal };
        };
        let unknown = format!("unknown compare operator '{}'", name.value());
        let is_union = matches!(self.source, Source::AnyOf(_));
        let is_slice = self.ty.is_slice();
        quote! {
            {
                const OPERATOR: ::daogen::CompareOperator = match ::daogen::CompareOperator::from_name(#name) {
                    ::std::option::Option::Some(operator) => operator,
                    ::std::option::Option::None => ::std::panic!("{}", #unknown),
                };
                const _: () = {
                    ::std::assert!(
                        !(OPERATOR.is_multi() && #is_union),
                        "any_of cannot be combined with a multi-value operator (in, notIn)"
                    );
                    ::std::assert!(!OPERATOR.is_multi() || #is_slice, "in and notIn require a Vec field");
                };
                OPERATOR
            }
        }
    }
}
