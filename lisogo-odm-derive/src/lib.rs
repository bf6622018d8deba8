use deluxe::ExtractAttributes;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields};

mod codegen;
mod process;

/// Derives `lisogo_odm::Document` for a struct with named fields.
///
/// Container attribute: `#[document(collection = "...", name = "...")]`.
/// Without collection, the documents can only be nested in others. The
/// name stored in `_type` defaults to the name of the struct.
///
/// Field attributes:
///
/// * `#[field(meta = true)]` marks the `DocumentMeta` field, exactly one is required,
/// * `#[field(ignore = true)]` keeps a field out of the stored document,
/// * `#[field(embedded = true)]` stores an `Option<T: Document>` in place,
/// * `#[field(reference = true)]` stores an `Option<Reference<T>>` by id,
/// * `#[field(default = expr)]` sets the value given by `Default`,
/// * `#[field(validate = path)]` makes the setter fallible and runs `path(&value)`.
///
/// The derive also implements `Default`, one getter and one `set_*` setter
/// per stored field, and registers the type for dynamic finds.
#[proc_macro_derive(Document, attributes(document, field))]
pub fn document_derive(input: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(input as DeriveInput);
    expand(&mut input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &mut DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let attributes = process::DocumentAttributes::extract_attributes(input)?;
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Document derive macro does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Document derive macro only supports structs with named fields",
            ))
        }
    };

    let output = process::process_fields(name, fields)?;
    let document = codegen::generate_document(name, &attributes, &output);
    let accessors = codegen::generate_accessors(name, &output.stored);

    Ok(quote! {
        #document
        #accessors
    })
}
