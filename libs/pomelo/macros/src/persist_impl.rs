use darling::FromDeriveInput as _;
use darling::{Error, Result};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::args::{FieldArgs, PersistInput, SurrogateArgs, VariantArgs, accessor_ident, field_name, method_path};

pub fn entry_point(input: &syn::DeriveInput) -> Result<TokenStream> {
    let parsed = PersistInput::from_derive_input(input)?;

    if !parsed.generics.params.is_empty() {
        return Err(
            Error::custom("persistable types cannot be generic").with_span(&parsed.generics)
        );
    }

    match &parsed.data {
        darling::ast::Data::Struct(fields) => emit_struct(&parsed, &fields.fields),
        darling::ast::Data::Enum(variants) => emit_enum(&parsed, variants),
    }
}

fn crate_path(input: &PersistInput) -> syn::Path {
    input
        .crate_
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::pomelo))
}

struct Member<'a> {
    ident: &'a syn::Ident,
    args: &'a FieldArgs,
}

fn emit_struct(input: &PersistInput, fields: &[FieldArgs]) -> Result<TokenStream> {
    let mut acc = Error::accumulator();
    let ty = &input.ident;
    let crate_ = crate_path(input);

    let mut members: Vec<Member<'_>> = Vec::new();
    let mut unknown_field: Option<&syn::Ident> = None;

    for field in fields {
        let ident = field.ident.as_ref().expect("named fields only");
        let marker_count = usize::from(field.required.is_present())
            + usize::from(field.optional.is_present());

        if field.unknown.is_present() {
            if marker_count != 0 || field.merge.is_present() || field.alias.is_some() {
                acc.push(
                    Error::custom("`unknown` cannot be combined with other persist markers")
                        .with_span(ident),
                );
            }
            if unknown_field.is_some() {
                acc.push(
                    Error::custom("only one field may carry the unknown storage").with_span(ident),
                );
            }
            unknown_field = Some(ident);
            continue;
        }

        match marker_count {
            // fields without a marker are not persisted
            0 => {
                if field.alias.is_some()
                    || field.merge.is_present()
                    || field.serialize_if.is_some()
                    || field.skip_if_default.is_present()
                {
                    acc.push(
                        Error::custom(
                            "persist markers require `required` or `optional` on the field",
                        )
                        .with_span(ident),
                    );
                }
                continue;
            }
            1 => {}
            _ => {
                acc.push(
                    Error::custom("`required` and `optional` are mutually exclusive")
                        .with_span(ident),
                );
                continue;
            }
        }

        if field.serialize_if.is_some() && field.skip_if_default.is_present() {
            acc.push(
                Error::custom("`serialize_if` and `skip_if_default` are mutually exclusive")
                    .with_span(ident),
            );
        }
        if field.required.is_present()
            && (field.serialize_if.is_some() || field.skip_if_default.is_present())
        {
            acc.push(
                Error::custom("a required field cannot be conditionally omitted").with_span(ident),
            );
        }

        members.push(Member { ident, args: field });
    }

    acc.finish()?;

    let accessors = members.iter().map(|member| emit_accessors(ty, &crate_, member));
    let member_descs = members.iter().map(|member| emit_member_desc(member));

    let wire_name = input.name.clone().unwrap_or_else(|| ty.to_string());
    let compact = input.compact.is_present();

    let before_hooks = input.before_write.iter().enumerate().map(|(i, path)| {
        let fn_name = format_ident!("__before_write_{i}");
        let method = method_path(ty, path);
        quote! {
            fn #fn_name(obj: &dyn PersistObject) {
                #method(__p::downcast_ref::<#ty>(obj));
            }
        }
    });
    let before_names = (0..input.before_write.len()).map(|i| format_ident!("__before_write_{i}"));

    let after_hooks = input.after_read.iter().enumerate().map(|(i, path)| {
        let fn_name = format_ident!("__after_read_{i}");
        let method = method_path(ty, path);
        quote! {
            fn #fn_name(obj: &mut dyn PersistObject) {
                #method(__p::downcast_mut::<#ty>(obj));
            }
        }
    });
    let after_names = (0..input.after_read.len()).map(|i| format_ident!("__after_read_{i}"));

    let (unknown_support, unknown_tokens) = match unknown_field {
        None => (TokenStream::new(), quote! { ::std::option::Option::None }),
        Some(field) => (
            quote! {
                fn __unknown_get(obj: &dyn PersistObject) -> &#crate_::UnknownStorage {
                    &__p::downcast_ref::<#ty>(obj).#field
                }

                fn __unknown_get_mut(
                    obj: &mut dyn PersistObject,
                ) -> &mut #crate_::UnknownStorage {
                    &mut __p::downcast_mut::<#ty>(obj).#field
                }
            },
            quote! {
                ::std::option::Option::Some(UnknownAccess {
                    get: __unknown_get,
                    get_mut: __unknown_get_mut,
                })
            },
        ),
    };

    let (surrogate_tokens, surrogate_support, wire_impl) = match &input.surrogate {
        None => (
            quote! { ::std::option::Option::None },
            TokenStream::new(),
            emit_wire_record(ty, &crate_),
        ),
        Some(surrogate) => emit_surrogate(ty, &crate_, surrogate),
    };

    Ok(quote! {
        #[allow(non_snake_case)]
        const _: () = {
            use #crate_::meta::{BinAccess, JsonAccess, MemberDesc, TypeDesc, UnknownAccess};
            use #crate_::private as __p;
            use #crate_::{Persist, PersistObject, Wire};

            #( #accessors )*
            #( #before_hooks )*
            #( #after_hooks )*
            #unknown_support
            #surrogate_support

            fn __factory() -> ::std::boxed::Box<dyn PersistObject> {
                ::std::boxed::Box::new(<#ty as ::std::default::Default>::default())
            }

            fn __type_id() -> ::std::any::TypeId {
                ::std::any::TypeId::of::<#ty>()
            }

            const __MEMBERS: &[MemberDesc] = &[ #( #member_descs ),* ];
            const __BEFORE_WRITE: &[fn(&dyn PersistObject)] = &[ #( #before_names ),* ];
            const __AFTER_READ: &[fn(&mut dyn PersistObject)] = &[ #( #after_names ),* ];

            static __DESC: TypeDesc = TypeDesc {
                name: #wire_name,
                type_id: __type_id,
                compact: #compact,
                factory: __factory,
                members: __MEMBERS,
                unknown_storage: #unknown_tokens,
                surrogate: #surrogate_tokens,
                before_write: __BEFORE_WRITE,
                after_read: __AFTER_READ,
            };

            #[automatically_derived]
            impl PersistObject for #ty {
                fn type_name(&self) -> &str {
                    __DESC.name
                }

                fn descriptor(&self) -> ::std::option::Option<&'static TypeDesc> {
                    ::std::option::Option::Some(&__DESC)
                }

                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }

                fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                    self
                }

                fn clone_boxed(&self) -> ::std::boxed::Box<dyn PersistObject> {
                    ::std::boxed::Box::new(::std::clone::Clone::clone(self))
                }
            }

            #[automatically_derived]
            impl Persist for #ty {
                fn descriptor() -> &'static TypeDesc {
                    &__DESC
                }
            }

            #wire_impl
        };
    })
}

fn emit_accessors(ty: &syn::Ident, crate_: &syn::Path, member: &Member<'_>) -> TokenStream {
    let field = member.ident;
    let field_ty = &member.args.ty;
    let bin_write = accessor_ident("bin_write", field);
    let bin_read = accessor_ident("bin_read", field);
    let bin_merge = accessor_ident("bin_merge", field);
    let json_write = accessor_ident("json_write", field);
    let json_read = accessor_ident("json_read", field);
    let json_merge = accessor_ident("json_merge", field);

    let compact_hint = member.args.compact.is_present().then(|| {
        quote! { __p::force_compact(w); }
    });

    let serialize_if = if let Some(path) = &member.args.serialize_if {
        let method = method_path(ty, path);
        let ser_if = accessor_ident("ser_if", field);
        Some(quote! {
            fn #ser_if(obj: &dyn PersistObject) -> bool {
                #method(__p::downcast_ref::<#ty>(obj))
            }
        })
    } else if member.args.skip_if_default.is_present() {
        let ser_if = accessor_ident("ser_if", field);
        Some(quote! {
            fn #ser_if(obj: &dyn PersistObject) -> bool {
                __p::downcast_ref::<#ty>(obj).#field
                    != <#field_ty as ::std::default::Default>::default()
            }
        })
    } else {
        None
    };

    quote! {
        fn #bin_write(
            obj: &dyn PersistObject,
            w: &mut __p::BinWriter<'_>,
        ) -> #crate_::Result<()> {
            <#field_ty as Wire>::bin_write(&__p::downcast_ref::<#ty>(obj).#field, w)
        }

        fn #bin_read(
            obj: &mut dyn PersistObject,
            r: &mut __p::BinReader<'_>,
        ) -> #crate_::Result<()> {
            __p::downcast_mut::<#ty>(obj).#field = <#field_ty as Wire>::bin_read(r)?;
            ::std::result::Result::Ok(())
        }

        fn #bin_merge(
            obj: &mut dyn PersistObject,
            r: &mut __p::BinReader<'_>,
        ) -> #crate_::Result<()> {
            <#field_ty as Wire>::bin_merge(&mut __p::downcast_mut::<#ty>(obj).#field, r)
        }

        fn #json_write(
            obj: &dyn PersistObject,
            w: &mut __p::JsonWriter<'_>,
        ) -> #crate_::Result<__p::Json> {
            #compact_hint
            <#field_ty as Wire>::json_write(&__p::downcast_ref::<#ty>(obj).#field, w)
        }

        fn #json_read(
            obj: &mut dyn PersistObject,
            r: &mut __p::JsonReader<'_>,
            v: &__p::Json,
        ) -> #crate_::Result<()> {
            __p::downcast_mut::<#ty>(obj).#field = <#field_ty as Wire>::json_read(r, v)?;
            ::std::result::Result::Ok(())
        }

        fn #json_merge(
            obj: &mut dyn PersistObject,
            r: &mut __p::JsonReader<'_>,
            v: &__p::Json,
        ) -> #crate_::Result<()> {
            <#field_ty as Wire>::json_merge(&mut __p::downcast_mut::<#ty>(obj).#field, r, v)
        }

        #serialize_if
    }
}

fn emit_member_desc(member: &Member<'_>) -> TokenStream {
    let field = member.ident;
    let field_ty = &member.args.ty;
    let name = field_name(field);
    let alias = match &member.args.alias {
        Some(alias) => quote! { ::std::option::Option::Some(#alias) },
        None => quote! { ::std::option::Option::None },
    };
    let required = member.args.required.is_present();
    let compact = member.args.compact.is_present();
    let merge = member.args.merge.is_present();

    let serialize_if = if member.args.serialize_if.is_some()
        || member.args.skip_if_default.is_present()
    {
        let ser_if = accessor_ident("ser_if", field);
        quote! { ::std::option::Option::Some(#ser_if) }
    } else {
        quote! { ::std::option::Option::None }
    };

    let bin_write = accessor_ident("bin_write", field);
    let bin_read = accessor_ident("bin_read", field);
    let bin_merge = accessor_ident("bin_merge", field);
    let json_write = accessor_ident("json_write", field);
    let json_read = accessor_ident("json_read", field);
    let json_merge = accessor_ident("json_merge", field);

    quote! {
        MemberDesc {
            name: #name,
            alias: #alias,
            required: #required,
            compact: #compact,
            merge: #merge,
            can_merge: <#field_ty as Wire>::CAN_MERGE,
            value_type: <#field_ty as Wire>::value_type,
            register: <#field_ty as Wire>::register_types,
            serialize_if: #serialize_if,
            bin: BinAccess {
                write: #bin_write,
                read: #bin_read,
                merge: #bin_merge,
            },
            json: JsonAccess {
                write: #json_write,
                read: #json_read,
                merge: #json_merge,
            },
        }
    }
}

fn emit_wire_record(ty: &syn::Ident, crate_: &syn::Path) -> TokenStream {
    quote! {
        #[automatically_derived]
        impl Wire for #ty {
            const CAN_MERGE: bool = true;

            fn value_type() -> #crate_::ValueType {
                #crate_::ValueType::Record
            }

            fn nullable_value_type() -> #crate_::ValueType {
                #crate_::ValueType::Record
            }

            fn register_types() {
                __p::ensure_registered::<#ty>();
            }

            fn bin_write(&self, w: &mut __p::BinWriter<'_>) -> #crate_::Result<()> {
                __p::write_object(self, w)
            }

            fn bin_write_opt(
                value: ::std::option::Option<&Self>,
                w: &mut __p::BinWriter<'_>,
            ) -> #crate_::Result<()> {
                match value {
                    ::std::option::Option::Some(v) => __p::write_object(v, w),
                    ::std::option::Option::None => __p::write_null_object(w),
                }
            }

            fn bin_read(r: &mut __p::BinReader<'_>) -> #crate_::Result<Self> {
                __p::read_object_concrete::<Self>(r)
            }

            fn bin_read_opt(
                r: &mut __p::BinReader<'_>,
            ) -> #crate_::Result<::std::option::Option<Self>> {
                __p::read_object_concrete_opt::<Self>(r)
            }

            fn bin_merge(&mut self, r: &mut __p::BinReader<'_>) -> #crate_::Result<()> {
                __p::merge_object_concrete(self, r)
            }

            fn json_write(&self, w: &mut __p::JsonWriter<'_>) -> #crate_::Result<__p::Json> {
                __p::write_object_json(self, w, false)
            }

            fn json_read(r: &mut __p::JsonReader<'_>, v: &__p::Json) -> #crate_::Result<Self> {
                __p::read_object_json_concrete::<Self>(r, v)
            }

            fn json_merge(
                &mut self,
                r: &mut __p::JsonReader<'_>,
                v: &__p::Json,
            ) -> #crate_::Result<()> {
                __p::merge_object_json_concrete(self, r, v)
            }
        }
    }
}

fn emit_surrogate(
    ty: &syn::Ident,
    crate_: &syn::Path,
    surrogate: &SurrogateArgs,
) -> (TokenStream, TokenStream, TokenStream) {
    let s_ty = &surrogate.ty;
    let to = method_path(ty, &surrogate.to);
    let from = method_path(ty, &surrogate.from);
    let conditional = surrogate.only_if.is_some();
    let surrogate_name = quote!(#s_ty).to_string();

    let desc = quote! {
        ::std::option::Option::Some(#crate_::SurrogateDesc {
            surrogate_name: #surrogate_name,
            type_id: __surrogate_type_id,
            value_type: <#s_ty as Wire>::value_type,
            conditional: #conditional,
            register: <#s_ty as Wire>::register_types,
        })
    };

    let cond_check = surrogate.only_if.as_ref().map(|path| {
        let cond = method_path(ty, path);
        quote! { const _: fn(&#ty) -> bool = #cond; }
    });

    let support = quote! {
        fn __surrogate_type_id() -> ::std::any::TypeId {
            ::std::any::TypeId::of::<#s_ty>()
        }

        const _: fn(&#ty) -> #s_ty = #to;
        const _: fn(#s_ty) -> #ty = #from;
        #cond_check
    };

    let wire_impl = if let Some(only_if) = &surrogate.only_if {
        let cond = method_path(ty, only_if);
        quote! {
            #[automatically_derived]
            impl Wire for #ty {
                fn value_type() -> #crate_::ValueType {
                    #crate_::ValueType::Record
                }

                fn nullable_value_type() -> #crate_::ValueType {
                    #crate_::ValueType::Record
                }

                fn register_types() {
                    __p::ensure_registered::<#ty>();
                    <#s_ty as Wire>::register_types();
                }

                fn bin_write(&self, w: &mut __p::BinWriter<'_>) -> #crate_::Result<()> {
                    __p::touch_schema::<#ty>(w.options())?;
                    if #cond(self) {
                        __p::write_object(&#to(self), w)
                    } else {
                        __p::write_object(self, w)
                    }
                }

                fn bin_write_opt(
                    value: ::std::option::Option<&Self>,
                    w: &mut __p::BinWriter<'_>,
                ) -> #crate_::Result<()> {
                    match value {
                        ::std::option::Option::Some(v) => v.bin_write(w),
                        ::std::option::Option::None => __p::write_null_object(w),
                    }
                }

                fn bin_read(r: &mut __p::BinReader<'_>) -> #crate_::Result<Self> {
                    __p::touch_schema::<#ty>(r.options())?;
                    match __p::read_object_dyn(r)? {
                        ::std::option::Option::None => {
                            ::std::result::Result::Err(__p::unexpected_null(r))
                        }
                        ::std::option::Option::Some(obj) => {
                            __p::downcast_surrogate::<#ty, #s_ty>(obj, #from)
                        }
                    }
                }

                fn bin_read_opt(
                    r: &mut __p::BinReader<'_>,
                ) -> #crate_::Result<::std::option::Option<Self>> {
                    match __p::read_object_dyn(r)? {
                        ::std::option::Option::None => ::std::result::Result::Ok(None),
                        ::std::option::Option::Some(obj) => {
                            __p::downcast_surrogate::<#ty, #s_ty>(obj, #from)
                                .map(::std::option::Option::Some)
                        }
                    }
                }

                fn json_write(&self, w: &mut __p::JsonWriter<'_>) -> #crate_::Result<__p::Json> {
                    __p::touch_schema::<#ty>(w.options())?;
                    if #cond(self) {
                        __p::write_object_json(&#to(self), w, true)
                    } else {
                        __p::write_object_json(self, w, false)
                    }
                }

                fn json_read(r: &mut __p::JsonReader<'_>, v: &__p::Json) -> #crate_::Result<Self> {
                    __p::touch_schema::<#ty>(r.options())?;
                    __p::read_object_json_surrogate::<#ty, #s_ty>(r, v, #from)
                }
            }
        }
    } else {
        quote! {
            #[automatically_derived]
            impl Wire for #ty {
                fn value_type() -> #crate_::ValueType {
                    <#s_ty as Wire>::value_type()
                }

                fn nullable_value_type() -> #crate_::ValueType {
                    <#s_ty as Wire>::nullable_value_type()
                }

                fn register_types() {
                    __p::ensure_registered::<#ty>();
                    <#s_ty as Wire>::register_types();
                }

                fn bin_write(&self, w: &mut __p::BinWriter<'_>) -> #crate_::Result<()> {
                    __p::touch_schema::<#ty>(w.options())?;
                    <#s_ty as Wire>::bin_write(&#to(self), w)
                }

                fn bin_write_opt(
                    value: ::std::option::Option<&Self>,
                    w: &mut __p::BinWriter<'_>,
                ) -> #crate_::Result<()> {
                    match value {
                        ::std::option::Option::Some(v) => {
                            <#s_ty as Wire>::bin_write_opt(::std::option::Option::Some(&#to(v)), w)
                        }
                        ::std::option::Option::None => {
                            <#s_ty as Wire>::bin_write_opt(::std::option::Option::None, w)
                        }
                    }
                }

                fn bin_read(r: &mut __p::BinReader<'_>) -> #crate_::Result<Self> {
                    __p::touch_schema::<#ty>(r.options())?;
                    ::std::result::Result::Ok(#from(<#s_ty as Wire>::bin_read(r)?))
                }

                fn bin_read_opt(
                    r: &mut __p::BinReader<'_>,
                ) -> #crate_::Result<::std::option::Option<Self>> {
                    ::std::result::Result::Ok(<#s_ty as Wire>::bin_read_opt(r)?.map(#from))
                }

                fn json_write(&self, w: &mut __p::JsonWriter<'_>) -> #crate_::Result<__p::Json> {
                    __p::touch_schema::<#ty>(w.options())?;
                    <#s_ty as Wire>::json_write(&#to(self), w)
                }

                fn json_read(r: &mut __p::JsonReader<'_>, v: &__p::Json) -> #crate_::Result<Self> {
                    __p::touch_schema::<#ty>(r.options())?;
                    ::std::result::Result::Ok(#from(<#s_ty as Wire>::json_read(r, v)?))
                }
            }
        }
    };

    (desc, support, wire_impl)
}

fn emit_enum(input: &PersistInput, variants: &[VariantArgs]) -> Result<TokenStream> {
    let ty = &input.ident;
    let crate_ = crate_path(input);

    if input.compact.is_present() || input.surrogate.is_some() || input.name.is_some() {
        return Err(Error::custom(
            "enum persistence supports no type-level attributes; variants encode by value",
        )
        .with_span(ty));
    }

    let mut next = 0i32;
    let mut idents = Vec::with_capacity(variants.len());
    let mut names = Vec::with_capacity(variants.len());
    let mut values = Vec::with_capacity(variants.len());
    for variant in variants {
        let value = match &variant.discriminant {
            None => next,
            Some(expr) => parse_discriminant(expr)?,
        };
        next = value.wrapping_add(1);
        idents.push(&variant.ident);
        names.push(variant.ident.to_string());
        values.push(value);
    }

    Ok(quote! {
        const _: () = {
            use #crate_::Wire;
            use #crate_::private as __p;

            #[automatically_derived]
            impl Wire for #ty {
                fn value_type() -> #crate_::ValueType {
                    #crate_::ValueType::Int
                }

                fn bin_write(&self, w: &mut __p::BinWriter<'_>) -> #crate_::Result<()> {
                    __p::write_enum(w, match self { #( Self::#idents => #values, )* })
                }

                fn bin_read(r: &mut __p::BinReader<'_>) -> #crate_::Result<Self> {
                    let value = __p::read_enum(r)?;
                    match value {
                        #( #values => ::std::result::Result::Ok(Self::#idents), )*
                        _ => ::std::result::Result::Err(__p::invalid_enum(r, value)),
                    }
                }

                fn json_write(&self, w: &mut __p::JsonWriter<'_>) -> #crate_::Result<__p::Json> {
                    if w.json_options().enum_as_string {
                        ::std::result::Result::Ok(__p::Json::String(
                            match self { #( Self::#idents => #names, )* }.to_owned(),
                        ))
                    } else {
                        ::std::result::Result::Ok(__p::Json::from(
                            match self { #( Self::#idents => #values, )* },
                        ))
                    }
                }

                fn json_read(r: &mut __p::JsonReader<'_>, v: &__p::Json) -> #crate_::Result<Self> {
                    if let ::std::option::Option::Some(name) = v.as_str() {
                        return match name {
                            #( #names => ::std::result::Result::Ok(Self::#idents), )*
                            _ => ::std::result::Result::Err(
                                __p::invalid_enum_json("enum variant name", v),
                            ),
                        };
                    }
                    if let ::std::option::Option::Some(value) = v.as_i64() {
                        if let ::std::result::Result::Ok(value) = i32::try_from(value) {
                            return match value {
                                #( #values => ::std::result::Result::Ok(Self::#idents), )*
                                _ => ::std::result::Result::Err(
                                    __p::invalid_enum_json("enum variant value", v),
                                ),
                            };
                        }
                    }
                    ::std::result::Result::Err(__p::invalid_enum_json("enum variant", v))
                }
            }
        };
    })
}

fn parse_discriminant(expr: &syn::Expr) -> Result<i32> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit),
            ..
        }) => lit.base10_parse().map_err(Error::from),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => parse_discriminant(expr).map(|v| -v),
        other => Err(Error::custom("enum discriminants must be integer literals").with_span(other)),
    }
}
