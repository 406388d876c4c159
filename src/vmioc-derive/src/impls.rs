use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, ToTokens};
use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{
    AngleBracketedGenericArguments, Attribute, Error as SynError, FnArg, GenericArgument, Ident,
    ImplItem, ImplItemFn, ItemImpl, LitStr, Meta, PathArguments, Result as SynResult, ReturnType,
    Type, TypePath, Visibility,
};

use crate::attrs::AttributeData;

const RETURN_TYPE_MESSAGE: &str = "a constructor's return type should be `Self` or `Result<Self, E>`";
const PARAMETER_MESSAGE: &str = "a constructor parameter should be `Arc<T>` or `Vec<Arc<T>>`";

#[derive(Debug)]
struct ConstructorData {
    identifier: Ident,
    visibility: VisibilityData,
    explicit: bool,
    parameters: Vec<ParameterData>,
    return_type: ReturnTypeData,
}

#[derive(Debug)]
enum VisibilityData {
    Public,
    Internal,
    Private,
}

#[derive(Debug)]
struct ParameterData {
    span: Span,
    kind: ParameterKind,
    name: Option<LitStr>,
}

#[derive(Debug)]
enum ParameterKind {
    Single(Type),
    Sequence(Type),
}

#[derive(Debug)]
enum ReturnTypeData {
    Infallible,
    Fallible,
}

struct AttributeRemovalVisitor;

impl AttributeRemovalVisitor {
    fn is_custom_attribute(attr: &Attribute) -> bool {
        let path = attr.path();
        path.is_ident("constructor") || path.is_ident("resolve_using") || path.is_ident("named")
    }
}

impl VisitMut for AttributeRemovalVisitor {
    fn visit_impl_item_fn_mut(&mut self, item_fn: &mut ImplItemFn) {
        item_fn.attrs.retain(|attr| !Self::is_custom_attribute(attr));
        for input in item_fn.sig.inputs.iter_mut() {
            if let FnArg::Typed(input) = input {
                input.attrs.retain(|attr| !Self::is_custom_attribute(attr));
            }
        }
        visit_mut::visit_impl_item_fn_mut(self, item_fn);
    }
}

pub fn expand_implementation(
    impls: TokenStream,
    attr_data: AttributeData,
) -> SynResult<TokenStream2> {
    let mut impls = match syn::parse::<ItemImpl>(impls) {
        Ok(impls) => impls,
        Err(err) => {
            return Err(SynError::new(
                err.span(),
                "`#[injectable]` should be annotated on the `impl` block",
            ))
        }
    };

    if let Some((_, path, _)) = &impls.trait_ {
        return Err(SynError::new(
            path.span(),
            "`#[injectable]` should be annotated on an inherent `impl` block",
        ));
    }

    let constructors = impls
        .items
        .iter()
        .filter_map(filter_and_map_item_fn)
        .filter(|item_fn| constructor_marker(item_fn).is_some())
        .map(|item_fn| parse_constructor(item_fn, &impls.self_ty))
        .collect::<SynResult<Vec<_>>>()?;

    let expanded = expand_injectable_implementation(&impls, &constructors, &attr_data);

    let mut visitor = AttributeRemovalVisitor;
    visitor.visit_item_impl_mut(&mut impls);

    Ok(quote! {
        #impls
        #expanded
    })
}

fn filter_and_map_item_fn(item: &ImplItem) -> Option<&ImplItemFn> {
    if let ImplItem::Fn(impl_fn) = item {
        Some(impl_fn)
    } else {
        None
    }
}

/// `Some(true)` for `#[resolve_using]`, `Some(false)` for `#[constructor]`.
fn constructor_marker(item_fn: &ImplItemFn) -> Option<bool> {
    item_fn.attrs.iter().find_map(|attr| {
        if attr.path().is_ident("resolve_using") {
            Some(true)
        } else if attr.path().is_ident("constructor") {
            Some(false)
        } else {
            None
        }
    })
}

fn parse_constructor(item_fn: &ImplItemFn, self_type: &Type) -> SynResult<ConstructorData> {
    let signature = &item_fn.sig;

    if let Some(FnArg::Receiver(rec)) = signature.inputs.first() {
        return Err(SynError::new(
            rec.span(),
            "method is not allowed to be a constructor",
        ));
    }
    if let Some(asyncness) = &signature.asyncness {
        return Err(SynError::new(
            asyncness.span(),
            "a constructor should not be `async`",
        ));
    }
    if !signature.generics.params.is_empty() {
        return Err(SynError::new(
            signature.generics.span(),
            "a constructor should not be generic",
        ));
    }

    let parameters = signature
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(input) => Some(input),
            FnArg::Receiver(_) => None,
        })
        .map(|input| {
            Ok(ParameterData {
                span: input.span(),
                kind: parse_parameter_type(&input.ty)?,
                name: parse_parameter_attributes(&input.attrs)?,
            })
        })
        .collect::<SynResult<Vec<_>>>()?;

    Ok(ConstructorData {
        identifier: signature.ident.clone(),
        visibility: parse_visibility(&item_fn.vis),
        explicit: constructor_marker(item_fn).unwrap_or(false),
        parameters,
        return_type: parse_constructor_return_type(&signature.output, self_type)?,
    })
}

fn parse_visibility(vis: &Visibility) -> VisibilityData {
    match vis {
        Visibility::Public(_) => VisibilityData::Public,
        Visibility::Restricted(_) => VisibilityData::Internal,
        Visibility::Inherited => VisibilityData::Private,
    }
}

fn parse_parameter_type(ty: &Type) -> SynResult<ParameterKind> {
    if let Some(inner) = single_type_argument(ty, "Arc") {
        return Ok(ParameterKind::Single(inner.clone()));
    }
    if let Some(element) = single_type_argument(ty, "Vec") {
        if let Some(inner) = single_type_argument(element, "Arc") {
            return Ok(ParameterKind::Sequence(inner.clone()));
        }
    }
    Err(SynError::new(ty.span(), PARAMETER_MESSAGE))
}

/// The `T` of `Wrapper<T>`, matched on the last path segment.
fn single_type_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(AngleBracketedGenericArguments { args, .. }) =
        &segment.arguments
    else {
        return None;
    };
    match (args.len(), args.first()) {
        (1, Some(GenericArgument::Type(inner))) => Some(inner),
        _ => None,
    }
}

fn parse_parameter_attributes(attrs: &[Attribute]) -> SynResult<Option<LitStr>> {
    let mut res = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("named")) {
        let Meta::List(list) = &attr.meta else {
            return Err(SynError::new(
                attr.span(),
                "expects `#[named(...)]` to receive a string literal",
            ));
        };
        if res.is_some() {
            return Err(SynError::new(
                list.span(),
                "only one `#[named(...)]` is allowed on a parameter",
            ));
        }
        res = Some(attr.parse_args::<LitStr>()?);
    }

    Ok(res)
}

fn parse_constructor_return_type(
    output: &ReturnType,
    self_type: &Type,
) -> SynResult<ReturnTypeData> {
    let ReturnType::Type(_, return_type) = output else {
        return Err(SynError::new(output.span(), RETURN_TYPE_MESSAGE));
    };

    if is_self_type(return_type, self_type) {
        return Ok(ReturnTypeData::Infallible);
    }

    let Type::Path(TypePath { qself: None, path }) = return_type.as_ref() else {
        return Err(SynError::new(return_type.span(), RETURN_TYPE_MESSAGE));
    };
    let is_result_path = match path.segments.len() {
        1 => true,
        3 => {
            path.segments[0].ident == "std"
                && path.segments[1].ident == "result"
        }
        _ => false,
    };
    let Some(last) = path.segments.last().filter(|last| last.ident == "Result") else {
        return Err(SynError::new(return_type.span(), RETURN_TYPE_MESSAGE));
    };
    if !is_result_path {
        return Err(SynError::new(return_type.span(), RETURN_TYPE_MESSAGE));
    }

    let PathArguments::AngleBracketed(AngleBracketedGenericArguments { args, .. }) =
        &last.arguments
    else {
        return Err(SynError::new(last.span(), RETURN_TYPE_MESSAGE));
    };
    match args.first() {
        Some(GenericArgument::Type(ok_type))
            if args.len() == 2 && is_self_type(ok_type, self_type) =>
        {
            Ok(ReturnTypeData::Fallible)
        }
        _ => Err(SynError::new(args.span(), RETURN_TYPE_MESSAGE)),
    }
}

fn is_self_type(ty: &Type, self_type: &Type) -> bool {
    if let Type::Path(TypePath { qself: None, path }) = ty {
        if path.is_ident("Self") {
            return true;
        }
    }
    ty.to_token_stream().to_string() == self_type.to_token_stream().to_string()
}

fn expand_injectable_implementation(
    impls: &ItemImpl,
    constructors: &[ConstructorData],
    attr_data: &AttributeData,
) -> TokenStream2 {
    let self_type = &impls.self_ty;
    let (impl_generics, _, where_clause) = impls.generics.split_for_impl();

    let implements = attr_data
        .implements
        .iter()
        .map(|service| quote! { .implements::<#service>() })
        .collect::<TokenStream2>();

    let disposable = if attr_data.dispose {
        quote! { .disposable() }
    } else {
        TokenStream2::new()
    };

    let constructors_expanded = constructors
        .iter()
        .map(expand_constructor)
        .collect::<TokenStream2>();

    let upcasts = attr_data
        .implements
        .iter()
        .map(|service| {
            quote! {
                impl #impl_generics vmioc::types::Upcast<#service> for #self_type #where_clause {
                    fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<#service> {
                        self
                    }
                }
            }
        })
        .collect::<TokenStream2>();

    let submission = if impls.generics.params.is_empty() {
        quote! {
            vmioc::__private::inventory::submit! {
                vmioc::types::TypeRegistration::new(
                    <#self_type as vmioc::types::Injectable>::type_info
                )
            }
        }
    } else {
        TokenStream2::new()
    };

    quote! {
        impl #impl_generics vmioc::types::Injectable for #self_type #where_clause {
            fn type_info() -> vmioc::types::TypeInfo {
                vmioc::types::TypeInfo::builder::<Self>()
                    #implements
                    #disposable
                    #constructors_expanded
                    .build()
            }
        }

        #upcasts
        #submission
    }
}

fn expand_constructor(ctor: &ConstructorData) -> TokenStream2 {
    let identifier = &ctor.identifier;
    let name = LitStr::new(&identifier.to_string(), identifier.span());

    let visibility = match ctor.visibility {
        VisibilityData::Public => quote! { vmioc::types::Visibility::Public },
        VisibilityData::Internal => quote! { vmioc::types::Visibility::Internal },
        VisibilityData::Private => quote! { vmioc::types::Visibility::Private },
    };

    let get_dep_statements = ctor
        .parameters
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let dep = Ident::new(&format!("dep{i}"), param.span);
            match &param.kind {
                ParameterKind::Single(ty) => {
                    quote! { let #dep = arguments.single::<#ty>()?; }
                }
                ParameterKind::Sequence(ty) => {
                    quote! { let #dep = arguments.sequence::<#ty>()?; }
                }
            }
        })
        .collect::<TokenStream2>();

    let dep_args = (0..ctor.parameters.len())
        .map(|i| {
            let dep = Ident::new(&format!("dep{i}"), ctor.parameters[i].span);
            quote! { #dep, }
        })
        .collect::<TokenStream2>();

    let construct = match ctor.return_type {
        ReturnTypeData::Infallible => quote! { Self::#identifier(#dep_args) },
        ReturnTypeData::Fallible => quote! { Self::#identifier(#dep_args)? },
    };

    let arguments = if ctor.parameters.is_empty() {
        quote! { _arguments }
    } else {
        quote! { mut arguments }
    };

    let parameters = ctor
        .parameters
        .iter()
        .map(|param| {
            let info = match &param.kind {
                ParameterKind::Single(ty) => quote! { vmioc::types::ParameterInfo::single::<#ty>() },
                ParameterKind::Sequence(ty) => {
                    quote! { vmioc::types::ParameterInfo::sequence::<#ty>() }
                }
            };
            match &param.name {
                Some(name) => quote! { .parameter(#info.named(#name)) },
                None => quote! { .parameter(#info) },
            }
        })
        .collect::<TokenStream2>();

    let explicit = if ctor.explicit {
        quote! { .explicit() }
    } else {
        TokenStream2::new()
    };

    quote! {
        .constructor(
            vmioc::types::ConstructorInfo::new(#name, #visibility, |#arguments| {
                #get_dep_statements
                ::std::result::Result::Ok(vmioc::types::erase(#construct))
            })
            #parameters
            #explicit
        )
    }
}
