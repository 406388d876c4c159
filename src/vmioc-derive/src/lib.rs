mod attrs;
mod impls;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::Result as SynResult;

/// Describes a type to the container from its `impl` block.
///
/// Associated functions marked `#[constructor]` or `#[resolve_using]` become
/// constructors. Their parameters are `Arc<T>` or `Vec<Arc<T>>`, optionally
/// marked `#[named("...")]`, and they return `Self` or `Result<Self, E>`.
///
/// `#[injectable(implements(dyn A, dyn B), dispose)]` additionally makes the
/// type castable to each listed trait object and hands it to `Dispose` when
/// the container releases it.
///
/// Non-generic types are submitted to `TypeCatalog::global()`. Generic ones
/// have to be added to a catalog by hand.
#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    match injectable_impl(attr, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn injectable_impl(attr: TokenStream, item: TokenStream) -> SynResult<TokenStream2> {
    let attr_data = attrs::parse_attributes(attr)?;
    let expanded = impls::expand_implementation(item, attr_data)?;
    Ok(expanded)
}
