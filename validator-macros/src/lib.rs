use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Expr, ExprLit, ItemFn, Lit, Meta,
    punctuated::Punctuated, Token,
};

/// Procedural macro to declare a metadata validator for one block type.
///
/// Usage:
/// ```ignore
/// #[meta_validator(block_type = "TEXT")]
/// fn validate_text(meta: &serde_json::Map<String, serde_json::Value>) -> ValidationResult {
///     // implementation
/// }
/// ```
///
/// This generates a unit struct (`TextMetaValidator`) implementing the
/// `MetaValidator` trait, keyed by the block type tag.
#[proc_macro_attribute]
pub fn meta_validator(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    let mut block_type: Option<String> = None;

    for meta in args {
        if let Meta::NameValue(nv) = meta {
            if nv.path.is_ident("block_type") {
                if let Expr::Lit(ExprLit { lit: Lit::Str(lit_str), .. }) = nv.value {
                    block_type = Some(lit_str.value());
                }
            }
        }
    }

    let block_type = match block_type {
        Some(tag) if !tag.is_empty() => tag,
        _ => {
            return syn::Error::new(
                proc_macro2::Span::call_site(),
                "meta_validator macro requires a non-empty 'block_type' attribute",
            )
            .to_compile_error()
            .into();
        }
    };

    // "TEXT" -> "TextMetaValidator"
    let struct_name = derive_struct_name(&block_type);
    let fn_name = &input_fn.sig.ident;

    let expanded = quote! {
        pub struct #struct_name;

        impl crate::validators::core::MetaValidator for #struct_name {
            fn block_type(&self) -> &str {
                #block_type
            }

            fn validate(
                &self,
                meta: &serde_json::Map<String, serde_json::Value>,
            ) -> crate::validators::core::ValidationResult {
                #fn_name(meta)
            }
        }

        #input_fn
    };

    TokenStream::from(expanded)
}

/// Derive a struct name from a block type tag.
///
/// Examples:
/// - "TEXT" -> "TextMetaValidator"
/// - "CONTAINER" -> "ContainerMetaValidator"
/// - "CODE_BLOCK" -> "CodeBlockMetaValidator"
fn derive_struct_name(block_type: &str) -> proc_macro2::Ident {
    let name = block_type
        .split(|c: char| c == '_' || c == '.' || c == '-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first_char) => {
                    let mut capitalized = first_char.to_uppercase().to_string();
                    capitalized.push_str(&chars.as_str().to_lowercase());
                    capitalized
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("");

    format_ident!("{}MetaValidator", name)
}
