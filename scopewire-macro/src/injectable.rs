use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = generate_injectable_impl(&input).unwrap_or_else(syn::Error::into_compile_error);
    TokenStream::from(expanded)
}

fn generate_injectable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Injectable)] can only be applied to structs",
            ))
        }
    };

    let parameters = fields.iter().map(|field| {
        let ty = &field.ty;
        quote! { <#ty as ::scopewire::Dependency>::parameter() }
    });

    // Each field is resolved as a constructor argument, so cached singletons
    // and scoped values are reused.
    let resolve = |ty: &syn::Type| {
        quote! { <#ty as ::scopewire::Dependency>::from_argument(container)? }
    };

    let construction = match fields {
        Fields::Named(named) => {
            let injections = named.named.iter().map(|field| {
                let field_name = &field.ident;
                let value = resolve(&field.ty);
                quote! { #field_name: #value }
            });
            quote! { Self { #(#injections),* } }
        }
        Fields::Unnamed(unnamed) => {
            let injections = unnamed.unnamed.iter().map(|field| resolve(&field.ty));
            quote! { Self(#(#injections),*) }
        }
        Fields::Unit => quote! { Self },
    };

    Ok(quote! {
        impl #impl_generics ::scopewire::Injectable for #struct_name #ty_generics #where_clause {
            fn parameters() -> ::std::vec::Vec<::scopewire::Parameter> {
                ::std::vec![#(#parameters),*]
            }

            #[allow(unused_variables)]
            fn inject(
                container: &::scopewire::Container
            ) -> ::scopewire::Result<Self> {
                Ok(#construction)
            }
        }
    })
}
