use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, Ident, ItemStruct, Path, Token,
};

struct ModuleItem {
    attrs: Vec<Attribute>,
    path: Path,
}

impl Parse for ModuleItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path = input.parse()?;
        Ok(ModuleItem { attrs, path })
    }
}

#[derive(Default)]
struct ModuleArgs {
    imports: Vec<ModuleItem>,
    singletons: Vec<ModuleItem>,
    scoped: Vec<ModuleItem>,
    transients: Vec<ModuleItem>,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let name: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            // Parse array: [Item1, Item2, ...]
            let content;
            syn::bracketed!(content in input);
            let items: Vec<ModuleItem> = content
                .parse_terminated(ModuleItem::parse, Token![,])?
                .into_iter()
                .collect();

            let target = if name == "imports" {
                &mut args.imports
            } else if name == "singletons" {
                &mut args.singletons
            } else if name == "scoped" {
                &mut args.scoped
            } else if name == "transients" {
                &mut args.transients
            } else {
                return Err(syn::Error::new_spanned(
                    name,
                    "expected one of `imports`, `singletons`, `scoped`, `transients`",
                ));
            };
            target.extend(items);

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let expanded = generate_module_impl(&args, &input);

    TokenStream::from(expanded)
}

fn provider_registrations<'a>(
    items: &'a [ModuleItem],
    lifetime: &'a TokenStream2,
) -> impl Iterator<Item = TokenStream2> + 'a {
    items.iter().map(move |item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            container.register_injectable::<#path>(#lifetime)?;
        }
    })
}

fn generate_module_impl(args: &ModuleArgs, input: &ItemStruct) -> TokenStream2 {
    let module_name = &input.ident;

    // Generate import registrations (call other modules' register)
    let import_registrations = args.imports.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            <#path as ::scopewire::Module>::register(container)?;
        }
    });

    let singleton = quote!(::scopewire::Lifetime::Singleton);
    let scoped = quote!(::scopewire::Lifetime::Scoped);
    let transient = quote!(::scopewire::Lifetime::Transient);

    let singleton_registrations = provider_registrations(&args.singletons, &singleton);
    let scoped_registrations = provider_registrations(&args.scoped, &scoped);
    let transient_registrations = provider_registrations(&args.transients, &transient);

    quote! {
        #input

        impl ::scopewire::Module for #module_name {
            #[allow(unused_variables)]
            fn register(
                container: &::scopewire::Container
            ) -> ::scopewire::Result<()> {
                #(#import_registrations)*
                #(#singleton_registrations)*
                #(#scoped_registrations)*
                #(#transient_registrations)*
                Ok(())
            }
        }

        impl #module_name {
            /// Create a new container, register this module and build it
            pub fn create_container() -> ::scopewire::Result<::scopewire::Container> {
                let container = ::scopewire::Container::new();
                <Self as ::scopewire::Module>::register(&container)?;
                container.build()?;
                Ok(container)
            }
        }
    }
}
