//! Procedural macros for the Jii application framework.
//!
//! - `#[derive(Identifiable)]` - Implements `Identifiable` and `TypeInfo`
//!   and submits the type's lineage to the distributed type registry

use proc_macro::TokenStream;

mod identity;

/// Derive macro implementing `Identifiable` and `TypeInfo`.
///
/// ```rust,ignore
/// #[derive(Default, Identifiable)]
/// #[jii(name = "app.controllers.SiteController", parent = "jii.base.Controller")]
/// struct SiteController {
///     core: ControllerCore,
/// }
/// ```
///
/// Without `name` the type's identifier is used.
#[proc_macro_derive(Identifiable, attributes(jii))]
pub fn derive_identifiable(input: TokenStream) -> TokenStream {
    identity::derive_identifiable_impl(input)
}
