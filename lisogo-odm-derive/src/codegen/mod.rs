mod accessors;

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::process::{DocumentAttributes, Kind, Output, StoredField};

pub use accessors::generate_accessors;

fn encode_field(field: &StoredField) -> TokenStream {
    let StoredField { ident, key, .. } = field;
    let value = match field.kind {
        Kind::Value => quote! { ::lisogo_odm::son::encode_value(&self.#ident)? },
        Kind::Embedded => quote! { ::lisogo_odm::son::encode_embedded(&self.#ident)? },
        Kind::Reference => quote! { ::lisogo_odm::son::encode_reference(&self.#ident, mapping)? },
    };
    quote! { son.insert(#key, #value); }
}

fn decode_field(field: &StoredField) -> TokenStream {
    let StoredField { ident, key, .. } = field;
    let value = match field.kind {
        Kind::Value => quote! { ::lisogo_odm::son::decode_value(value)? },
        Kind::Embedded => quote! { ::lisogo_odm::son::decode_embedded(value)? },
        Kind::Reference => quote! { ::lisogo_odm::son::decode_reference(value, mapping)? },
    };
    quote! {
        if let ::std::option::Option::Some(value) = son.get(#key) {
            self.#ident = #value;
        }
    }
}

/// `save_references` and `load_references`, only for documents holding
/// other documents.
fn generate_traversals(stored: &[StoredField]) -> TokenStream {
    let mut saves = Vec::new();
    let mut loads = Vec::new();

    for field in stored {
        let ident = &field.ident;
        match field.kind {
            Kind::Value => {}
            Kind::Embedded => {
                saves.push(quote! { ::lisogo_odm::son::save_embedded(&mut self.#ident, db).await?; });
                loads.push(quote! { ::lisogo_odm::son::load_embedded(&mut self.#ident, db).await?; });
            }
            Kind::Reference => {
                saves.push(quote! { ::lisogo_odm::son::save_reference(&mut self.#ident, db).await?; });
                loads.push(quote! { ::lisogo_odm::son::load_reference(&mut self.#ident, db).await?; });
            }
        }
    }

    if saves.is_empty() {
        return quote! {};
    }

    quote! {
        async fn save_references(&mut self, db: &::lisogo_odm::Database) -> ::lisogo_odm::Result<()> {
            #(#saves)*
            Ok(())
        }

        async fn load_references(&mut self, db: &::lisogo_odm::Database) -> ::lisogo_odm::Result<()> {
            #(#loads)*
            Ok(())
        }
    }
}

pub fn generate_document(name: &Ident, attributes: &DocumentAttributes, output: &Output) -> TokenStream {
    let type_name = attributes.name.clone().unwrap_or_else(|| name.to_string());
    let collection = match &attributes.collection {
        Some(collection) => quote! { ::std::option::Option::Some(#collection) },
        None => quote! { ::std::option::Option::None },
    };

    let Output {
        meta,
        stored,
        default_fields,
    } = output;

    let has_fields = !stored.is_empty();
    let encoders = stored.iter().map(encode_field);
    let decoders = stored.iter().map(decode_field);
    let traversals = generate_traversals(stored);

    quote! {
        #[::lisogo_odm::async_trait::async_trait]
        impl ::lisogo_odm::Document for #name {
            const TYPE_NAME: &'static str = #type_name;
            const COLLECTION: ::std::option::Option<&'static str> = #collection;
            const HAS_FIELDS: bool = #has_fields;

            fn meta(&self) -> &::lisogo_odm::DocumentMeta {
                &self.#meta
            }

            fn meta_mut(&mut self) -> &mut ::lisogo_odm::DocumentMeta {
                &mut self.#meta
            }

            #[allow(unused_variables)]
            fn write_fields(
                &self,
                son: &mut ::lisogo_odm::bson::Document,
                mapping: &mut ::lisogo_odm::son::TypesMapping,
            ) -> ::lisogo_odm::Result<()> {
                #(#encoders)*
                Ok(())
            }

            #[allow(unused_variables)]
            fn read_fields(
                &mut self,
                son: &::lisogo_odm::bson::Document,
                mapping: &::lisogo_odm::son::TypesMapping,
            ) -> ::lisogo_odm::Result<()> {
                #(#decoders)*
                Ok(())
            }

            #traversals
        }

        impl ::std::default::Default for #name {
            fn default() -> Self {
                Self {#(#default_fields),*}
            }
        }

        ::lisogo_odm::inventory::submit! {
            ::lisogo_odm::DocumentType {
                name: #type_name,
                collection: #collection,
                create: ::lisogo_odm::db::registry::create::<#name>,
            }
        }
    }
}
