use darling::util::Flag;
use darling::{FromDeriveInput, FromField, FromMeta, FromVariant};

#[derive(FromDeriveInput)]
#[darling(attributes(persist), supports(struct_named, enum_unit))]
pub struct PersistInput {
    pub ident: syn::Ident,
    pub generics: syn::Generics,
    pub data: darling::ast::Data<VariantArgs, FieldArgs>,

    /// Wire name override.
    #[darling(default)]
    pub name: Option<String>,
    pub compact: Flag,
    #[darling(default)]
    pub surrogate: Option<SurrogateArgs>,
    #[darling(multiple)]
    pub before_write: Vec<syn::Path>,
    #[darling(multiple)]
    pub after_read: Vec<syn::Path>,
    #[darling(default, rename = "crate")]
    pub crate_: Option<syn::Path>,
}

#[derive(FromMeta)]
pub struct SurrogateArgs {
    pub ty: syn::Path,
    pub to: syn::Path,
    pub from: syn::Path,
    #[darling(default)]
    pub only_if: Option<syn::Path>,
}

#[derive(FromField)]
#[darling(attributes(persist))]
pub struct FieldArgs {
    pub ident: Option<syn::Ident>,
    pub ty: syn::Type,

    pub required: Flag,
    pub optional: Flag,
    #[darling(default)]
    pub alias: Option<String>,
    pub compact: Flag,
    pub merge: Flag,
    #[darling(default)]
    pub serialize_if: Option<syn::Path>,
    pub skip_if_default: Flag,
    pub unknown: Flag,
}

#[derive(FromVariant)]
#[darling(attributes(persist))]
pub struct VariantArgs {
    pub ident: syn::Ident,
    pub discriminant: Option<syn::Expr>,
}

/// The field's plain name, without any raw-identifier prefix.
pub fn field_name(field: &syn::Ident) -> String {
    let name = field.to_string();
    name.strip_prefix("r#").map_or(name.clone(), str::to_owned)
}

/// A generated accessor function name for a field.
pub fn accessor_ident(prefix: &str, field: &syn::Ident) -> syn::Ident {
    quote::format_ident!("__{}_{}", prefix, field_name(field))
}

/// Resolves a possibly-bare method name against the deriving type, so
/// `serialize_if = "has_x"` means `Type::has_x`.
pub fn method_path(ty: &syn::Ident, path: &syn::Path) -> proc_macro2::TokenStream {
    if path.leading_colon.is_none() && path.segments.len() == 1 {
        let segment = &path.segments[0];
        quote::quote! { #ty::#segment }
    } else {
        quote::quote! { #path }
    }
}
