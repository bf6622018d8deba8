use deluxe::ExtractAttributes;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{punctuated::Punctuated, Field, Ident, Token, Type};

#[derive(ExtractAttributes, Default, Debug)]
#[deluxe(attributes(document), default)]
pub struct DocumentAttributes {
    pub collection: Option<String>,
    pub name: Option<String>,
}

#[derive(ExtractAttributes, Default, Debug)]
#[deluxe(attributes(field), default)]
struct FieldAttributes {
    meta: Option<bool>,
    ignore: Option<bool>,
    embedded: Option<bool>,
    reference: Option<bool>,
    default: Option<TokenStream>,
    validate: Option<TokenStream>,
}

pub enum Kind {
    Value,
    Embedded,
    Reference,
}

pub struct StoredField {
    pub ident: Ident,
    pub ty: Type,
    pub key: String,
    pub kind: Kind,
    pub validate: Option<TokenStream>,
}

pub struct Output {
    pub meta: Ident,
    pub stored: Vec<StoredField>,
    pub default_fields: Vec<TokenStream>,
}

pub fn process_fields(
    name: &Ident,
    fields: &Punctuated<Field, Token![,]>,
) -> syn::Result<Output> {
    let mut meta = None;
    let mut stored = Vec::new();
    let mut default_fields = Vec::new();

    for field in fields {
        let attributes = FieldAttributes::extract_attributes(&mut field.clone())?;
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "fields must be named"));
        };

        let flags = [
            attributes.meta,
            attributes.ignore,
            attributes.embedded,
            attributes.reference,
        ];
        if flags.iter().filter(|flag| flag.unwrap_or(false)).count() > 1 {
            return Err(syn::Error::new_spanned(
                field,
                "a field can only be one of `meta`, `ignore`, `embedded` or `reference`",
            ));
        }

        if attributes.meta.unwrap_or(false) {
            if meta.is_some() {
                return Err(syn::Error::new_spanned(field, "duplicate `meta` field"));
            }
            default_fields.push(quote! { #ident: ::lisogo_odm::DocumentMeta::default() });
            meta = Some(ident);
            continue;
        }

        default_fields.push(generate_default_field(&attributes.default, &ident, &field.ty));

        if attributes.ignore.unwrap_or(false) {
            continue;
        }

        let kind = if attributes.embedded.unwrap_or(false) {
            Kind::Embedded
        } else if attributes.reference.unwrap_or(false) {
            Kind::Reference
        } else {
            Kind::Value
        };

        if !matches!(kind, Kind::Value) && !is_nullable(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "embedded documents and references must be wrapped in an `Option`",
            ));
        }

        stored.push(StoredField {
            key: ident.unraw().to_string(),
            ident,
            ty: field.ty.clone(),
            kind,
            validate: attributes.validate,
        });
    }

    let Some(meta) = meta else {
        return Err(syn::Error::new_spanned(
            name,
            "a document needs a `DocumentMeta` field marked with `#[field(meta = true)]`",
        ));
    };

    Ok(Output {
        meta,
        stored,
        default_fields,
    })
}

// Default for Rust `Default` impl
fn generate_default_field(
    default: &Option<TokenStream>,
    field_name: &Ident,
    field_type: &Type,
) -> TokenStream {
    let default_value = match default {
        Some(value) if is_nullable(field_type) => {
            quote! { ::std::option::Option::Some((#value).into()) }
        }
        Some(value) => quote! { (#value).into() },
        None => quote! { ::std::default::Default::default() },
    };

    quote! { #field_name: #default_value }
}

pub fn is_nullable(ty: &Type) -> bool {
    matches!(ty, Type::Path(type_path) if type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"))
}
