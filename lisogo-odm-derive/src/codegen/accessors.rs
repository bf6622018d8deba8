use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::Ident;

use crate::process::StoredField;

/// A getter and a chaining setter per stored field. Setters mark the
/// document as modified when the value changes, and run the validator of
/// the field first when it has one.
pub fn generate_accessors(name: &Ident, stored: &[StoredField]) -> TokenStream {
    let accessors = stored.iter().map(|field| {
        let StoredField { ident, ty, .. } = field;
        let setter = format_ident!("set_{}", ident.unraw());

        let assign = quote! {
            if self.#ident != value {
                self.#ident = value;
                ::lisogo_odm::Document::meta_mut(self).touch();
            }
        };

        let set = match &field.validate {
            Some(validate) => quote! {
                pub fn #setter(
                    &mut self,
                    value: impl ::std::convert::Into<#ty>,
                ) -> ::lisogo_odm::Result<&mut Self> {
                    let value = value.into();
                    (#validate)(&value)?;
                    #assign
                    Ok(self)
                }
            },
            None => quote! {
                pub fn #setter(&mut self, value: impl ::std::convert::Into<#ty>) -> &mut Self {
                    let value = value.into();
                    #assign
                    self
                }
            },
        };

        quote! {
            pub fn #ident(&self) -> &#ty {
                &self.#ident
            }

            #set
        }
    });

    quote! {
        impl #name {
            #(#accessors)*
        }
    }
}
