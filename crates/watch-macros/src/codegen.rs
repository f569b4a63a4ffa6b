//! `Tracked` expansion

use crate::attrs::{ConstructorSpec, ContainerArgs, FieldArgs};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Result, Type};

struct TrackedField {
    ident: Ident,
    ty: Type,
    name: LitStr,
    constant: Ident,
    setter: Option<Ident>,
    sealed: bool,
}

impl TrackedField {
    fn base_mutator(&self) -> Ident {
        format_ident!("__tracked_set_{}", self.ident.unraw())
    }

    fn apply_fn(&self) -> Ident {
        format_ident!("__tracked_apply_{}", self.ident.unraw())
    }

    fn read_fn(&self) -> Ident {
        format_ident!("__tracked_read_{}", self.ident.unraw())
    }

    fn setter_method(&self) -> Ident {
        format_ident!("set_{}", self.ident.unraw())
    }
}

pub(crate) fn expand(input: &DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Tracked cannot be derived for generic types",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Tracked requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Tracked can only be derived for structs",
            ))
        }
    };

    let container = ContainerArgs::from_attrs(&input.attrs)?;

    let mut fields = Vec::new();
    for field in named {
        let args = FieldArgs::from_attrs(&field.attrs)?;
        if args.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let plain = ident.unraw();
        let name = args
            .rename
            .unwrap_or_else(|| LitStr::new(&plain.to_string(), plain.span()));
        fields.push(TrackedField {
            constant: format_ident!("{}", plain.to_string().to_uppercase()),
            ident,
            ty: field.ty.clone(),
            name,
            setter: args.setter,
            sealed: args.sealed,
        });
    }

    let inherent = expand_inherent(input, &fields, &container.constructors);
    let trackable = expand_trackable(input, &fields, &container);
    let setters = expand_setters(input, &fields);

    Ok(quote! {
        #inherent
        #trackable
        #setters
    })
}

fn expand_inherent(
    input: &DeriveInput,
    fields: &[TrackedField],
    constructors: &[ConstructorSpec],
) -> TokenStream {
    let ident = &input.ident;
    let vis = &input.vis;

    let properties = fields.iter().map(|field| {
        let TrackedField {
            ident: field_ident,
            ty,
            name,
            constant,
            ..
        } = field;
        let apply_fn = field.apply_fn();
        let read_fn = field.read_fn();
        let doc = format!("Tracked property `{}`", name.value());

        let (mutator, mutator_fn) = match &field.setter {
            Some(custom) => (quote!(Self::#custom), TokenStream::new()),
            None => {
                let base = field.base_mutator();
                (
                    quote!(Self::#base),
                    quote! {
                        #[doc(hidden)]
                        fn #base(&mut self, value: #ty) {
                            self.#field_ident = value;
                        }
                    },
                )
            }
        };

        quote! {
            #[doc = #doc]
            #vis const #constant: ::watch_core::Property<Self, #ty> = ::watch_core::Property::new(
                ::watch_core::PropertyId::new(
                    <Self as ::watch_core::Trackable>::TYPE_NAME,
                    #name,
                    ::std::stringify!(#ty),
                ),
                #mutator,
            );

            #mutator_fn

            #[doc(hidden)]
            fn #apply_fn(
                this: &mut Self,
                value: &::watch_core::Value,
            ) -> ::watch_core::WatchResult<()> {
                ::watch_core::apply_erased(&Self::#constant, this, value)
            }

            #[doc(hidden)]
            fn #read_fn(this: &Self) -> ::watch_core::Value {
                ::std::sync::Arc::new(::std::clone::Clone::clone(&this.#field_ident))
            }
        }
    });

    let default_initializer = if constructors.is_empty() {
        quote! {
            #[doc(hidden)]
            fn __tracked_ctor_default(
                _init: &mut ::watch_core::Init<'_, Self>,
                args: ::watch_core::ConstructorArgs,
            ) -> ::watch_core::WatchResult<()> {
                ::watch_core::downcast_args::<Self, ()>(args)
            }
        }
    } else {
        TokenStream::new()
    };

    let initializers = constructors.iter().map(|ctor| {
        let name = &ctor.name;
        let invoke = format_ident!("__tracked_ctor_{}", name.unraw());
        let params = &ctor.params;
        let args: Vec<Ident> = (0..params.len()).map(|i| format_ident!("a{}", i)).collect();
        quote! {
            #[doc(hidden)]
            fn #invoke(
                init: &mut ::watch_core::Init<'_, Self>,
                args: ::watch_core::ConstructorArgs,
            ) -> ::watch_core::WatchResult<()> {
                let ( #(#args,)* ) = ::watch_core::downcast_args::<Self, ( #(#params,)* )>(args)?;
                Self::#name(init, #(#args),*);
                ::std::result::Result::Ok(())
            }
        }
    });

    quote! {
        #[allow(dead_code)]
        impl #ident {
            #(#properties)*
            #(#initializers)*
            #default_initializer
        }
    }
}

fn expand_trackable(
    input: &DeriveInput,
    fields: &[TrackedField],
    container: &ContainerArgs,
) -> TokenStream {
    let ident = &input.ident;
    let sealed = container.sealed;

    let descriptors = fields.iter().map(|field| {
        let constant = &field.constant;
        let apply_fn = field.apply_fn();
        let read_fn = field.read_fn();
        let kind = if field.sealed {
            quote!(sealed)
        } else {
            quote!(overridable)
        };
        quote! {
            ::watch_core::PropertyDescriptor::#kind(
                Self::#constant.id(),
                Self::#apply_fn,
                Self::#read_fn,
            )
        }
    });

    let constructors = if container.constructors.is_empty() {
        quote! {
            ::watch_core::ConstructorDescriptor::new(
                "default",
                &[],
                ::std::any::TypeId::of::<()>,
                Self::__tracked_ctor_default,
            )
        }
    } else {
        let entries = container.constructors.iter().map(|ctor| {
            let name = &ctor.name;
            let label = name.unraw().to_string();
            let invoke = format_ident!("__tracked_ctor_{}", name.unraw());
            let params = &ctor.params;
            quote! {
                ::watch_core::ConstructorDescriptor::new(
                    #label,
                    &[ #(::std::stringify!(#params)),* ],
                    ::std::any::TypeId::of::<( #(#params,)* )>,
                    Self::#invoke,
                )
            }
        });
        quote!(#(#entries),*)
    };

    quote! {
        impl ::watch_core::Trackable for #ident {
            const TYPE_NAME: &'static str =
                ::std::concat!(::std::module_path!(), "::", ::std::stringify!(#ident));
            const SEALED: bool = #sealed;
            const PROPERTIES: &'static [::watch_core::PropertyDescriptor<Self>] = &[
                #(#descriptors),*
            ];
            const CONSTRUCTORS: &'static [::watch_core::ConstructorDescriptor<Self>] = &[
                #constructors
            ];
        }
    }
}

fn expand_setters(input: &DeriveInput, fields: &[TrackedField]) -> TokenStream {
    let ident = &input.ident;
    let vis = &input.vis;
    let trait_ident = format_ident!("{}Setters", ident);
    let trait_doc = format!("Tracked setters of [`{ident}`]");

    let methods = fields.iter().map(|field| {
        let method = field.setter_method();
        let constant = &field.constant;
        let ty = &field.ty;
        let doc = format!("Set `{}`", field.name.value());
        quote! {
            #[doc = #doc]
            fn #method(&mut self, value: #ty) {
                ::watch_core::Assign::<#ident>::assign(self, &#ident::#constant, value);
            }
        }
    });

    quote! {
        #[doc = #trait_doc]
        #vis trait #trait_ident: ::watch_core::Assign<#ident> {
            #(#methods)*
        }

        impl<A: ::watch_core::Assign<#ident> + ?Sized> #trait_ident for A {}
    }
}
