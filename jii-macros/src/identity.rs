//! `#[derive(Identifiable)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

/// Arguments of the `#[jii(...)]` attribute.
#[derive(Default)]
struct IdentityArgs {
    name: Option<LitStr>,
    parent: Option<LitStr>,
}

impl IdentityArgs {
    fn from_input(input: &DeriveInput) -> syn::Result<Self> {
        let mut args = IdentityArgs::default();
        for attr in input.attrs.iter().filter(|a| a.path().is_ident("jii")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    args.name = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("parent") {
                    args.parent = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown attribute. Expected: name, parent"))
                }
            })?;
        }
        Ok(args)
    }
}

pub fn derive_identifiable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let args = match IdentityArgs::from_input(&input) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    if name.value().is_empty() {
        return syn::Error::new_spanned(&name, "type name must not be empty")
            .to_compile_error()
            .into();
    }
    let parent = match &args.parent {
        Some(parent) => quote! { ::core::option::Option::Some(#parent) },
        None => quote! { ::core::option::Option::None },
    };

    // Generic types have no single lineage entry to submit.
    let submit = input.generics.params.is_empty().then(|| {
        quote! {
            ::jii::inventory::submit! {
                ::jii::Lineage::new(#name, #parent)
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::jii::TypeInfo for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #name;
            const PARENT_TYPE_NAME: ::core::option::Option<&'static str> = #parent;
        }

        impl #impl_generics ::jii::Identifiable for #ident #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                <Self as ::jii::TypeInfo>::TYPE_NAME
            }

            fn parent_type_name(&self) -> ::core::option::Option<&'static str> {
                <Self as ::jii::TypeInfo>::PARENT_TYPE_NAME
            }
        }

        #submit
    };

    TokenStream::from(expanded)
}
