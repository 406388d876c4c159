use proc_macro::TokenStream;
use syn::parse::{Parse, Parser};
use syn::{Result as SynResult, Token, Type};

#[derive(Debug, Default)]
pub struct AttributeData {
    pub implements: Vec<Type>,
    pub dispose: bool,
}

pub fn parse_attributes(attr: TokenStream) -> SynResult<AttributeData> {
    let mut data = AttributeData::default();
    if attr.is_empty() {
        return Ok(data);
    }

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("implements") {
            let content;
            syn::parenthesized!(content in meta.input);
            let types = content.parse_terminated(Type::parse, Token![,])?;
            data.implements.extend(types);
            Ok(())
        } else if meta.path.is_ident("dispose") {
            data.dispose = true;
            Ok(())
        } else {
            Err(meta.error("expects `implements(...)` or `dispose`"))
        }
    });
    parser.parse(attr)?;

    Ok(data)
}
