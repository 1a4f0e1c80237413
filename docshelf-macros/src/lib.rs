//! Procedural macros for the docshelf project.
//!
//! # `Document`
//!
//! Derives `docshelf::document::Document` for structs with named fields. Every field
//! becomes addressable by name, and its value is read through `FieldValue::from`, so each
//! field type needs a `From<T> for FieldValue` conversion.
//!
//! Field attributes:
//!
//! - `#[document(skip)]` - the field cannot be used as a primary key or index
//! - `#[document(rename = "name")]` - address the field by another name
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct Task {
//!     pub id: u64,
//!     #[document(rename = "state")]
//!     pub status: String,
//!     #[document(skip)]
//!     pub tags: Vec<String>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, ext::IdentExt, parse_macro_input};

#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand_document(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldOptions {
    skip: bool,
    rename: Option<String>,
}

fn field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions {
        skip: false,
        rename: None,
    };

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                options.rename = Some(name.value());
                return Ok(());
            }

            Err(meta.error("expected `skip` or `rename = \"...\"`"))
        })?;
    }

    Ok(options)
}

fn expand_document(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &ast.data else {
        return Err(syn::Error::new_spanned(
            ast,
            "Document can only be derived for structs",
        ));
    };

    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ast,
            "Document can only be derived for structs with named fields",
        ));
    };

    let mut names = Vec::new();
    let mut idents = Vec::new();

    for field in &fields.named {
        let options = field_options(field)?;

        if options.skip {
            continue;
        }

        let Some(ident) = &field.ident else {
            continue;
        };

        let name = options
            .rename
            .unwrap_or_else(|| ident.unraw().to_string());

        if names.contains(&name) {
            return Err(syn::Error::new_spanned(
                field,
                format!("field name \"{name}\" is used twice"),
            ));
        }

        names.push(name);
        idents.push(ident.clone());
    }

    let ident = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docshelf::document::Document for #ident #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn field(
                &self,
                name: &str,
            ) -> ::core::option::Option<::docshelf::value::FieldValue> {
                match name {
                    #(
                        #names => ::core::option::Option::Some(
                            ::docshelf::value::FieldValue::from(
                                ::core::clone::Clone::clone(&self.#idents)
                            )
                        ),
                    )*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}
