//! `#[derive(Document)]`: generates the memindex field walker per struct,
//! so nothing is inspected at runtime.
//!
//! Field attribute forms:
//!
//! - `#[index("term")]` / `#[index("range")]` / `#[index("on")]` annotate a
//!   field for indexing. The string is passed through verbatim; unknown
//!   annotations are rejected when the index is built.
//! - `#[index("...", custom)]` routes the field through the `CustomValue`
//!   trait instead of structural recognition.
//!
//! Recognized value types are `String`, the integer primitives, `Vec` of
//! either, and `Option`/`Box` wrappers around them. A field of any other
//! plain path type is a record: the walker descends into it
//! unconditionally (its type must also derive `Document`), and an
//! annotation on the field is inherited by children without one of their
//! own. Floats, `bool`, `char` and `Vec` of any other element type cannot
//! be indexed: annotated they walk as unsupported values and fail the
//! build, unannotated they are skipped silently.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments,
    Token, Type,
};

#[proc_macro_derive(Document, attributes(index))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Document requires named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Document can only be derived for structs",
            ))
        }
    };

    let mut steps = Vec::new();
    for field in fields {
        let attr = IndexAttr::from_field(field)?;
        steps.push(walk_field(field, &attr)?);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics memindex::Document for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn walk(
                &self,
                prefix: &memindex::FieldPath,
                inherited: ::core::option::Option<&'static str>,
                out: &mut ::std::vec::Vec<memindex::RawField>,
            ) {
                #(#steps)*
            }
        }
    })
}

/// Parsed `#[index(...)]` attribute of one field.
#[derive(Default)]
struct IndexAttr {
    annotation: Option<LitStr>,
    custom: bool,
}

impl IndexAttr {
    fn from_field(field: &Field) -> syn::Result<Self> {
        let mut result = IndexAttr::default();
        for attr in &field.attrs {
            if !attr.path().is_ident("index") {
                continue;
            }
            let args =
                attr.parse_args_with(Punctuated::<IndexArg, Token![,]>::parse_terminated)?;
            for arg in args {
                match arg {
                    IndexArg::Annotation(lit) => result.annotation = Some(lit),
                    IndexArg::Custom => result.custom = true,
                }
            }
        }
        Ok(result)
    }
}

enum IndexArg {
    Annotation(LitStr),
    Custom,
}

impl Parse for IndexArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(LitStr) {
            Ok(IndexArg::Annotation(input.parse()?))
        } else if lookahead.peek(syn::Ident) {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "custom" => Ok(IndexArg::Custom),
                other => Err(syn::Error::new(
                    ident.span(),
                    format!("unknown index option `{other}`"),
                )),
            }
        } else {
            Err(lookahead.error())
        }
    }
}

fn walk_field(field: &Field, attr: &IndexAttr) -> syn::Result<TokenStream2> {
    let ident = field.ident.as_ref().unwrap();
    let name = ident.to_string();
    let own = match &attr.annotation {
        Some(lit) => quote!(::core::option::Option::Some(#lit)),
        None => quote!(::core::option::Option::None),
    };

    if attr.custom {
        return Ok(quote! {
            out.push(memindex::RawField {
                path: prefix.join(#name),
                annotation: #own.or(inherited),
                value: memindex::CustomValue::index_value(&self.#ident),
            });
        });
    }

    let annotated = attr.annotation.is_some();
    let leaf = |ty: &Type, access: TokenStream2| {
        if let Some(value) = value_expr(ty, &access) {
            return quote! {
                out.push(memindex::RawField {
                    path: prefix.join(#name),
                    annotation: #own.or(inherited),
                    value: #value,
                });
            };
        }
        // Record kind: descend; children inherit this field's annotation
        // when they have none of their own.
        if record_kind(ty) {
            return quote! {
                memindex::Document::walk(#access, &prefix.join(#name), #own.or(inherited), out);
            };
        }
        // Annotated but not indexable: let the build report it.
        if annotated {
            let type_name = type_name(ty);
            quote! {
                out.push(memindex::RawField {
                    path: prefix.join(#name),
                    annotation: #own.or(inherited),
                    value: memindex::Value::Unsupported(#type_name),
                });
            }
        } else {
            TokenStream2::new()
        }
    };
    Ok(unwrapped(&field.ty, quote!((&self.#ident)), &leaf))
}

/// Peels `Option` and `Box` wrappers around the field access, then hands
/// the innermost reference to `leaf`. An absent optional emits nothing.
fn unwrapped(
    ty: &Type,
    access: TokenStream2,
    leaf: &dyn Fn(&Type, TokenStream2) -> TokenStream2,
) -> TokenStream2 {
    if let Some(inner) = wrapper_arg(ty, "Option") {
        let body = unwrapped(inner, quote!(__field), leaf);
        quote! {
            if let ::core::option::Option::Some(__field) = #access {
                #body
            }
        }
    } else if let Some(inner) = wrapper_arg(ty, "Box") {
        let body = unwrapped(inner, quote!(__field), leaf);
        quote! {
            {
                let __field = ::core::ops::Deref::deref(#access);
                #body
            }
        }
    } else {
        leaf(ty, access)
    }
}

const INT_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
];

const UNINDEXABLE_TYPES: &[&str] = &["f32", "f64", "bool", "char"];

/// Record kind: a plain path type that is neither a recognized value type
/// nor a known unindexable primitive. Such fields are descended into
/// unconditionally, so their type must also derive `Document`. Only
/// consulted after `value_expr` has declined the type, which is why `Vec`
/// (of an unrecognized element type by then) is excluded here.
fn record_kind(ty: &Type) -> bool {
    match last_segment(ty) {
        Some(segment) => {
            let ident = segment.ident.to_string();
            ident != "Vec" && !UNINDEXABLE_TYPES.contains(&ident.as_str())
        }
        None => false,
    }
}

/// Structural recognition: an expression producing the `Value` of a
/// recognized scalar or list type, `None` otherwise.
fn value_expr(ty: &Type, access: &TokenStream2) -> Option<TokenStream2> {
    let segment = last_segment(ty)?;
    let ident = segment.ident.to_string();
    if ident == "String" {
        return Some(quote!(memindex::Value::Str(#access.clone())));
    }
    if INT_TYPES.contains(&ident.as_str()) {
        return Some(quote!(memindex::Value::Int(*#access as i64)));
    }
    if ident == "Vec" {
        let inner = generic_arg(segment)?;
        let inner_ident = last_segment(inner)?.ident.to_string();
        if inner_ident == "String" {
            return Some(quote!(memindex::Value::StrList(#access.clone())));
        }
        if INT_TYPES.contains(&inner_ident.as_str()) {
            return Some(quote!(memindex::Value::IntList(
                #access.iter().map(|v| *v as i64).collect()
            )));
        }
    }
    None
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn wrapper_arg<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != name {
        return None;
    }
    generic_arg(segment)
}

fn generic_arg(segment: &syn::PathSegment) -> Option<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => {
            match args.args.first()? {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            }
        }
        _ => None,
    }
}

fn type_name(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}
