//! `#[tracked(...)]` attribute parsing

use syn::{
    parenthesized, parse::Parse, parse::ParseStream, punctuated::Punctuated, Attribute, Ident,
    LitStr, Result, Token, Type,
};

/// Forwarded constructor: `name(Type, ...)`
pub(crate) struct ConstructorSpec {
    pub(crate) name: Ident,
    pub(crate) params: Vec<Type>,
}

/// Container-level options
#[derive(Default)]
pub(crate) struct ContainerArgs {
    pub(crate) sealed: bool,
    pub(crate) constructors: Vec<ConstructorSpec>,
}

/// Field-level options
#[derive(Default)]
pub(crate) struct FieldArgs {
    pub(crate) skip: bool,
    pub(crate) sealed: bool,
    pub(crate) setter: Option<Ident>,
    pub(crate) rename: Option<LitStr>,
}

enum ContainerItem {
    Sealed,
    Constructor(ConstructorSpec),
}

enum FieldItem {
    Skip,
    Sealed,
    Setter(Ident),
    Rename(LitStr),
}

struct TrackedMeta<I> {
    items: Vec<I>,
}

impl<I: Parse> Parse for TrackedMeta<I> {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let items = Punctuated::<I, Token![,]>::parse_terminated(input)?;
        Ok(Self {
            items: items.into_iter().collect(),
        })
    }
}

impl Parse for ContainerItem {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let key: Ident = input.parse()?;
        match key.to_string().as_str() {
            "sealed" => Ok(Self::Sealed),
            "constructor" => {
                let content;
                parenthesized!(content in input);
                let name: Ident = content.parse()?;
                let params;
                parenthesized!(params in content);
                let params = Punctuated::<Type, Token![,]>::parse_terminated(&params)?;
                if !content.is_empty() {
                    return Err(content.error("expected a single `name(Type, ...)` signature"));
                }
                Ok(Self::Constructor(ConstructorSpec {
                    name,
                    params: params.into_iter().collect(),
                }))
            }
            other => Err(syn::Error::new(
                key.span(),
                format!("unknown tracked container attribute: {other}"),
            )),
        }
    }
}

impl Parse for FieldItem {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let key: Ident = input.parse()?;
        match key.to_string().as_str() {
            "skip" => Ok(Self::Skip),
            "sealed" => Ok(Self::Sealed),
            "setter" => {
                input.parse::<Token![=]>()?;
                Ok(Self::Setter(input.parse()?))
            }
            "rename" => {
                input.parse::<Token![=]>()?;
                Ok(Self::Rename(input.parse()?))
            }
            other => Err(syn::Error::new(
                key.span(),
                format!("unknown tracked field attribute: {other}"),
            )),
        }
    }
}

fn tracked_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("tracked"))
}

impl ContainerArgs {
    pub(crate) fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        for attr in tracked_attrs(attrs) {
            let meta: TrackedMeta<ContainerItem> = attr.parse_args()?;
            for item in meta.items {
                match item {
                    ContainerItem::Sealed => args.sealed = true,
                    ContainerItem::Constructor(spec) => {
                        if args.constructors.iter().any(|c| c.name == spec.name) {
                            return Err(syn::Error::new(
                                spec.name.span(),
                                format!("constructor `{}` declared twice", spec.name),
                            ));
                        }
                        if let Some(clash) =
                            args.constructors.iter().find(|c| c.params == spec.params)
                        {
                            return Err(syn::Error::new(
                                spec.name.span(),
                                format!(
                                    "constructors `{}` and `{}` share a signature",
                                    clash.name, spec.name
                                ),
                            ));
                        }
                        args.constructors.push(spec);
                    }
                }
            }
        }
        Ok(args)
    }
}

impl FieldArgs {
    pub(crate) fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        for attr in tracked_attrs(attrs) {
            let meta: TrackedMeta<FieldItem> = attr.parse_args()?;
            for item in meta.items {
                match item {
                    FieldItem::Skip => args.skip = true,
                    FieldItem::Sealed => args.sealed = true,
                    FieldItem::Setter(setter) => args.setter = Some(setter),
                    FieldItem::Rename(name) => args.rename = Some(name),
                }
            }
        }
        if args.skip && (args.sealed || args.setter.is_some() || args.rename.is_some()) {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "`skip` cannot be combined with other tracked field attributes",
            ));
        }
        Ok(args)
    }
}
