use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{Error, GenericArgument, PathArguments, Result, Type};

/// Go type a Rust field maps to.
pub(crate) enum GoType {
    Named(String),
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
}

impl GoType {
    pub(crate) fn from_rust(ty: &Type) -> Result<Self> {
        match ty {
            Type::Reference(reference) => Self::from_rust(&reference.elem),
            Type::Paren(paren) => Self::from_rust(&paren.elem),
            Type::Group(group) => Self::from_rust(&group.elem),
            Type::Slice(slice) => Ok(GoType::Slice(Box::new(Self::from_rust(&slice.elem)?))),
            Type::Path(path) => {
                let segment = path
                    .path
                    .segments
                    .last()
                    .ok_or_else(|| Error::new_spanned(ty, "empty type path"))?;
                let name = segment.ident.to_string();
                match name.as_str() {
                    "Option" => Ok(GoType::Pointer(Box::new(Self::from_rust(single_argument(
                        ty,
                        &segment.arguments,
                    )?)?))),
                    "Vec" => {
                        let inner = single_argument(ty, &segment.arguments)?;
                        match Self::from_rust(inner)? {
                            GoType::Named(element) if element == "uint8" => {
                                Ok(GoType::Slice(Box::new(GoType::Named("byte".into()))))
                            }
                            element => Ok(GoType::Slice(Box::new(element))),
                        }
                    }
                    "Box" => Self::from_rust(single_argument(ty, &segment.arguments)?),
                    other => Ok(GoType::Named(
                        primitive(other).map(str::to_string).unwrap_or_else(|| other.to_string()),
                    )),
                }
            }
            _ => Err(Error::new_spanned(
                ty,
                "unsupported field type, use #[daogen(go_type = \"...\")] to set the Go type",
            )),
        }
    }

    /// Parses an explicit `go_type` override such as `*time.Time`.
    pub(crate) fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix('*') {
            GoType::Pointer(Box::new(Self::parse(rest)))
        } else if let Some(rest) = text.strip_prefix("[]") {
            GoType::Slice(Box::new(Self::parse(rest)))
        } else {
            GoType::Named(text.to_string())
        }
    }

    /// Slice, possibly behind one pointer.
    pub(crate) fn is_slice(&self) -> bool {
        match self {
            GoType::Slice(_) => true,
            GoType::Pointer(inner) => matches!(**inner, GoType::Slice(_)),
            GoType::Named(_) => false,
        }
    }
}

impl ToTokens for GoType {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let expanded = match self {
            GoType::Named(name) => quote! { ::daogen::TypeRef::named(#name) },
            GoType::Pointer(inner) => quote! { ::daogen::TypeRef::pointer(#inner) },
            GoType::Slice(element) => quote! { ::daogen::TypeRef::slice(#element) },
        };
        tokens.extend(expanded);
    }
}

fn single_argument<'a>(ty: &'a Type, arguments: &'a PathArguments) -> Result<&'a Type> {
    if let PathArguments::AngleBracketed(args) = arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Ok(inner);
    }
    Err(Error::new_spanned(ty, "expected a single type argument"))
}

fn primitive(name: &str) -> Option<&'static str> {
    let go = match name {
        "String" | "str" => "string",
        "bool" => "bool",
        "i8" => "int8",
        "i16" => "int16",
        "i32" => "int32",
        "i64" => "int64",
        "isize" => "int",
        "u8" => "uint8",
        "u16" => "uint16",
        "u32" => "uint32",
        "u64" => "uint64",
        "usize" => "uint",
        "f32" => "float32",
        "f64" => "float64",
        "SystemTime" => "time.Time",
        _ => return None,
    };
    Some(go)
}
