use crate::common::{error, parse_meta_list, Result};
use darling::ast::NestedMeta;
use darling::FromMeta;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, parse_quote, Fields, ItemStruct, Lit, Meta, Path};

const ERR_NOT_STRUCT: &str = "settings should be a structure with named fields.";

#[derive(FromMeta)]
struct Options {
    #[darling(default = "Options::default_crate_path")]
    crate_path: Path,
}

impl Options {
    fn default_crate_path() -> Path {
        parse_quote!(::hydroeval)
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            crate_path: Options::default_crate_path(),
        }
    }
}

impl Parse for Options {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            Ok(Default::default())
        } else {
            let meta_list = parse_meta_list(&input)?;

            Ok(Self::from_list(&meta_list)?)
        }
    }
}

pub(crate) fn expand(args: TokenStream, item: TokenStream) -> TokenStream {
    let options = parse_macro_input!(args as Options);
    let item = parse_macro_input!(item as ItemStruct);

    expand_from_parsed(options, item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn doc_string(attrs: &[syn::Attribute]) -> String {
    let mut lines = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }

        if let Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: Lit::Str(s), ..
            }) = &nv.value
            {
                lines.push(s.value().trim().to_owned());
            }
        }
    }

    lines.join("\n")
}

fn expand_from_parsed(options: Options, item: ItemStruct) -> Result<proc_macro2::TokenStream> {
    let Fields::Named(fields) = &item.fields else {
        return error(&item, ERR_NOT_STRUCT);
    };

    // NOTE: unlike foundations' settings macro, hydroeval settings structs are
    // plain leaf config (no nested YAML-merge/enum support needed), so serde is
    // assumed to be a direct dependency of the crate the macro is used from
    // rather than reached through `crate_path`. `crate_path` is kept for parity
    // with the teacher macro's options shape and to silence "unused" lints on
    // `#[settings(crate_path = "...")]` call sites ported from docs.
    let _ = &options.crate_path;

    let ident = &item.ident;

    let field_doc_entries = fields.named.iter().map(|field| {
        let name = field.ident.as_ref().expect("named field").to_string();
        let doc = doc_string(&field.attrs);

        quote! { (#name, #doc) }
    });

    let field_count = fields.named.len();
    let vis = &item.vis;
    let attrs = &item.attrs;
    let generics = &item.generics;
    let field_defs = &fields.named;

    Ok(quote! {
        #(#attrs)*
        #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
        #vis struct #ident #generics {
            #field_defs
        }

        impl #generics #ident #generics {
            /// Doc comment for each field, in declaration order, as `(name, doc)`.
            pub const FIELD_DOCS: [(&'static str, &'static str); #field_count] = [
                #(#field_doc_entries),*
            ];
        }
    })
}
