//! `SeaOrmResource`: REST resource metadata derived from a SeaORM entity.
//!
//! Every entity in the control plane (`environments`, `service_instances`,
//! `dns_records`, `usage_intervals`, …) doubles as a REST resource. This
//! derive reads the table name the entity already declares and produces
//! the routing/documentation constants, so the table name stays the single
//! source of truth for how a resource is addressed.
//!
//! # Examples
//!
//! ```ignore
//! use sea_orm::entity::prelude::*;
//! use core_proc_macros::SeaOrmResource;
//!
//! #[derive(Clone, Debug, DeriveEntityModel, SeaOrmResource)]
//! #[sea_orm(table_name = "environments")]
//! pub struct Model {
//!     #[sea_orm(primary_key)]
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! assert_eq!(Model::COLLECTION, "environments");
//! assert_eq!(Model::URL, "/environments");
//! assert_eq!(Model::API_URL, "/api/environments");
//! assert_eq!(Model::TAG, "Environments");
//! ```
//!
//! Table names with underscores become hyphenated URLs and Title Case
//! documentation tags:
//!
//! ```ignore
//! #[derive(Clone, Debug, DeriveEntityModel, SeaOrmResource)]
//! #[sea_orm(table_name = "dns_records")]
//! pub struct Model { /* … */ }
//!
//! assert_eq!(Model::URL, "/dns-records");
//! assert_eq!(Model::TAG, "Dns Records");
//! ```
//!
//! Any of the constants can be pinned explicitly when the derived value
//! is not what the API should expose:
//!
//! ```ignore
//! #[derive(Clone, Debug, DeriveEntityModel, SeaOrmResource)]
//! #[sea_orm(table_name = "emulated_resources")]
//! #[sea_orm_resource(url = "/emulation", tag = "Cloud Emulation")]
//! pub struct Model { /* … */ }
//!
//! assert_eq!(Model::URL, "/emulation");
//! assert_eq!(Model::API_URL, "/api/emulation");
//! ```

extern crate proc_macro;

use darling::FromDeriveInput;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Lit, Meta};

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(sea_orm_resource), forward_attrs(sea_orm))]
struct SeaOrmResourceInput {
    ident: syn::Ident,
    attrs: Vec<syn::Attribute>,
    #[darling(default)]
    collection: Option<String>,
    #[darling(default)]
    url: Option<String>,
    #[darling(default)]
    tag: Option<String>,
}

/// The four constants a resource exposes, resolved from the table name
/// plus any explicit overrides.
struct ResourceNaming {
    collection: String,
    url: String,
    api_url: String,
    tag: String,
}

impl ResourceNaming {
    fn resolve(table_name: &str, input: &SeaOrmResourceInput) -> Self {
        let collection = input.collection.clone().unwrap_or_else(|| table_name.to_string());

        // URLs hyphenate ("dns_records" → "/dns-records"); the /api prefix
        // belongs to the router layer and is only baked into API_URL.
        let url = input
            .url
            .clone()
            .unwrap_or_else(|| format!("/{}", table_name.replace('_', "-")));

        let tag = input.tag.clone().unwrap_or_else(|| title_case(&collection));

        Self {
            api_url: format!("/api{url}"),
            collection,
            url,
            tag,
        }
    }
}

/// "usage_intervals" → "Usage Intervals"
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_name_of(attrs: &[syn::Attribute]) -> Option<String> {
    for attr in attrs {
        if !attr.path().is_ident("sea_orm") {
            continue;
        }
        let Meta::List(meta_list) = &attr.meta else {
            continue;
        };

        let mut table_name = None;
        let _ = meta_list.parse_nested_meta(|meta| {
            if meta.path.is_ident("table_name") {
                if let Lit::Str(lit) = meta.value()?.parse::<Lit>()? {
                    table_name = Some(lit.value());
                }
            }
            Ok(())
        });
        if table_name.is_some() {
            return table_name;
        }
    }
    None
}

/// Derives the `ApiResource` trait for a SeaORM entity.
///
/// Reads `#[sea_orm(table_name = "...")]` (required) and the optional
/// `#[sea_orm_resource(collection = …, url = …, tag = …)]` overrides.
///
/// # Generated Constants
///
/// - `COLLECTION`: the table name (e.g. `"port_allocations"`)
/// - `URL`: hyphenated base path (e.g. `"/port-allocations"`)
/// - `API_URL`: `URL` under the `/api` mount
/// - `TAG`: Title Case documentation tag (e.g. `"Port Allocations"`)
#[proc_macro_derive(SeaOrmResource, attributes(sea_orm_resource))]
pub fn sea_orm_resource_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = parse_macro_input!(input as DeriveInput);
    let receiver = match SeaOrmResourceInput::from_derive_input(&ast) {
        Ok(receiver) => receiver,
        Err(err) => return TokenStream::from(err.write_errors()),
    };

    match expand(receiver) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: SeaOrmResourceInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    let table_name = table_name_of(&input.attrs).ok_or_else(|| {
        syn::Error::new_spanned(
            ident,
            "SeaOrmResource requires #[sea_orm(table_name = \"...\")] attribute",
        )
    })?;

    let ResourceNaming {
        collection,
        url,
        api_url,
        tag,
    } = ResourceNaming::resolve(&table_name, &input);

    Ok(quote! {
        impl core_proc_macros::ApiResource for #ident {
            const URL: &'static str = #url;
            const API_URL: &'static str = #api_url;
            const COLLECTION: &'static str = #collection;
            const TAG: &'static str = #tag;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    fn expand_str(input: proc_macro2::TokenStream) -> String {
        let ast: DeriveInput = syn::parse2(input).unwrap();
        let receiver = SeaOrmResourceInput::from_derive_input(&ast).unwrap();
        expand(receiver).unwrap().to_string()
    }

    #[test]
    fn reads_table_name_among_other_attributes() {
        let input = quote! {
            #[derive(Clone, Debug)]
            #[sea_orm(table_name = "environments")]
            pub struct Model {
                id: String,
            }
        };

        let ast: DeriveInput = syn::parse2(input).unwrap();
        assert_eq!(table_name_of(&ast.attrs), Some("environments".to_string()));
    }

    #[test]
    fn plain_table_name_derives_all_four_constants() {
        let output = expand_str(quote! {
            #[sea_orm(table_name = "environments")]
            pub struct Model {
                id: String,
                name: String,
            }
        });

        assert!(output.contains("impl core_proc_macros :: ApiResource for Model"));
        assert!(output.contains(r#"const COLLECTION : & 'static str = "environments""#));
        assert!(output.contains(r#"const URL : & 'static str = "/environments""#));
        assert!(output.contains(r#"const API_URL : & 'static str = "/api/environments""#));
        assert!(output.contains(r#"const TAG : & 'static str = "Environments""#));
    }

    #[test]
    fn underscored_table_name_hyphenates_url_and_title_cases_tag() {
        let output = expand_str(quote! {
            #[sea_orm(table_name = "dns_records")]
            pub struct Model {
                id: String,
            }
        });

        assert!(output.contains(r#"const COLLECTION : & 'static str = "dns_records""#));
        assert!(output.contains(r#"const URL : & 'static str = "/dns-records""#));
        assert!(output.contains(r#"const API_URL : & 'static str = "/api/dns-records""#));
        assert!(output.contains(r#"const TAG : & 'static str = "Dns Records""#));
    }

    #[test]
    fn explicit_url_overrides_and_feeds_api_url() {
        let output = expand_str(quote! {
            #[sea_orm(table_name = "emulated_resources")]
            #[sea_orm_resource(url = "/emulation")]
            pub struct Model {
                id: String,
            }
        });

        assert!(output.contains(r#"const URL : & 'static str = "/emulation""#));
        assert!(output.contains(r#"const API_URL : & 'static str = "/api/emulation""#));
    }

    #[test]
    fn all_overrides_win_over_derived_values() {
        let output = expand_str(quote! {
            #[sea_orm(table_name = "usage_intervals")]
            #[sea_orm_resource(
                collection = "usage_ledger",
                url = "/usage",
                tag = "Billing Accrual"
            )]
            pub struct Model {
                id: String,
            }
        });

        assert!(output.contains(r#"const COLLECTION : & 'static str = "usage_ledger""#));
        assert!(output.contains(r#"const URL : & 'static str = "/usage""#));
        assert!(output.contains(r#"const TAG : & 'static str = "Billing Accrual""#));
    }

    #[test]
    fn missing_table_name_is_an_error() {
        let input = quote! {
            pub struct Model {
                id: String,
            }
        };

        let ast: DeriveInput = syn::parse2(input).unwrap();
        let receiver = SeaOrmResourceInput::from_derive_input(&ast).unwrap();
        assert!(expand(receiver).is_err());
    }

    #[test]
    fn title_case_handles_control_plane_tables() {
        assert_eq!(title_case("environments"), "Environments");
        assert_eq!(title_case("port_allocations"), "Port Allocations");
        assert_eq!(title_case("usage_intervals"), "Usage Intervals");
        assert_eq!(title_case(""), "");
    }
}
