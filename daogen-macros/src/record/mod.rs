mod field;
mod go_type;

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Result};

use field::ParsedField;

pub(crate) struct ParsedRecord {
    ident: Ident,
    go_name: String,
    table: String,
    fields: Vec<ParsedField>,
}

impl ParsedRecord {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut table: Option<String> = None;
        let mut go_name: Option<String> = None;

        for attr in &input.attrs {
            if !attr.path().is_ident("daogen") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().trim().is_empty() {
                        return Err(Error::new(value.span(), "table name cannot be empty"));
                    }
                    table = Some(value.value());
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    go_name = Some(value.value());
                } else {
                    return Err(meta.error("unknown record attribute, expected table or name"));
                }
                Ok(())
            })?;
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.ident.span(), "Record requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Record can only be derived for structs")),
        };

        let ident = input.ident.clone();
        let snake = ident.to_string().to_snake_case();
        Ok(Self {
            go_name: go_name.unwrap_or_else(|| ident.to_string().to_upper_camel_case()),
            table: table.unwrap_or_else(|| format!("{snake}s")),
            ident,
            fields,
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let ident = &self.ident;
        let go_name = &self.go_name;
        let table = &self.table;
        let fields = self.fields.iter().map(ParsedField::emit);

        quote! {
            impl ::daogen::Record for #ident {
                const NAME: &'static str = #go_name;
                const TABLE: &'static str = #table;

                fn fields() -> ::std::vec::Vec<::daogen::FieldDescriptor> {
                    ::std::vec![#(#fields),*]
                }
            }
        }
    }
}
