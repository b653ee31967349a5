mod common;
mod settings;

use proc_macro::TokenStream;

/// Derives a documented settings structure.
///
/// See `hydroeval::settings` for usage. A deliberately smaller sibling of
/// `foundations`' `#[settings]` macro: it only supports structs with named
/// fields (no enum variants, no nested YAML-merge machinery), which is all
/// hydroeval's own configuration surface needs.
#[proc_macro_attribute]
pub fn settings(args: TokenStream, item: TokenStream) -> TokenStream {
    settings::expand(args, item)
}
