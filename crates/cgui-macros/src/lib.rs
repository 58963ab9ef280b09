//! Procedural macros for cgui.
//!
//! # `#[behavior]`
//!
//! Placed on an `impl Behavior for T` block, computes
//! `Behavior::CAPABILITIES` from the hook methods the block defines:
//!
//! ```ignore
//! use cgui_core::{Behavior, Context, Propagation, behavior};
//!
//! struct Ticker;
//!
//! #[behavior]
//! impl Behavior for Ticker {
//!     fn create(&mut self, _cx: &mut Context<'_>) {}
//!
//!     fn process_systems(&mut self, _cx: &mut Context<'_>) -> Propagation {
//!         Propagation::Continue
//!     }
//! }
//!
//! // Ticker::CAPABILITIES == Capabilities::CREATE | Capabilities::PROCESS_SYSTEMS
//! ```
//!
//! Attribute arguments:
//! - `crate = path`: where to find `Capabilities` (defaults to `::cgui_core`)

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{ImplItem, ItemImpl, Path, parse_macro_input, parse_quote};

/// Hook method names and the `Capabilities` flag each one sets.
const HOOKS: &[(&str, &str)] = &[
    ("create", "CREATE"),
    ("destroy", "DESTROY"),
    ("handle_os_event", "HANDLE_OS_EVENT"),
    ("process_events", "PROCESS_EVENTS"),
    ("process_systems", "PROCESS_SYSTEMS"),
    ("process_graphics", "PROCESS_GRAPHICS"),
    ("poll_os_event", "POLL_OS_EVENT"),
];

/// Fill in `Behavior::CAPABILITIES` from the hooks defined in an impl block.
///
/// The block must be a trait impl of `Behavior` and must not define
/// `CAPABILITIES` itself. Hooks with the wrong signature are rejected by the
/// compiler as a mismatch with the trait.
#[proc_macro_attribute]
pub fn behavior(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut krate: Path = parse_quote!(::cgui_core);
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("crate") {
            krate = meta.value()?.parse()?;
            Ok(())
        } else {
            Err(meta.error("unsupported behavior argument; expected `crate = path`"))
        }
    });
    parse_macro_input!(attr with parser);

    let mut item_impl = parse_macro_input!(item as ItemImpl);
    match expand_behavior(&krate, &mut item_impl) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_behavior(krate: &Path, item_impl: &mut ItemImpl) -> syn::Result<TokenStream2> {
    let is_behavior_impl = item_impl
        .trait_
        .as_ref()
        .and_then(|(_, path, _)| path.segments.last())
        .is_some_and(|segment| segment.ident == "Behavior");
    if !is_behavior_impl {
        return Err(syn::Error::new_spanned(
            &item_impl.self_ty,
            "#[behavior] must be placed on an `impl Behavior for T` block",
        ));
    }

    let mut flags = Vec::new();
    for item in &item_impl.items {
        match item {
            ImplItem::Const(constant) if constant.ident == "CAPABILITIES" => {
                return Err(syn::Error::new_spanned(
                    constant,
                    "CAPABILITIES is computed by #[behavior]; remove the manual definition",
                ));
            }
            ImplItem::Fn(method) => {
                let name = method.sig.ident.to_string();
                if let Some((_, flag)) = HOOKS.iter().find(|(hook, _)| *hook == name) {
                    flags.push(format_ident!("{}", flag));
                }
            }
            _ => {}
        }
    }

    let capabilities = capabilities_expr(krate, &flags);
    item_impl.items.push(parse_quote! {
        const CAPABILITIES: #krate::Capabilities = #capabilities;
    });
    Ok(quote!(#item_impl))
}

/// `Capabilities::empty()` or a `const`-evaluable chain of `union` calls.
fn capabilities_expr(krate: &Path, flags: &[syn::Ident]) -> TokenStream2 {
    let mut flags = flags.iter();
    let Some(first) = flags.next() else {
        return quote!(#krate::Capabilities::empty());
    };
    let mut expr = quote!(#krate::Capabilities::#first);
    for flag in flags {
        expr = quote!(#expr.union(#krate::Capabilities::#flag));
    }
    expr
}
