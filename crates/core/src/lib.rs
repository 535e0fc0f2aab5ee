//! Panificación Modelo Core - catalog model and validation.
//!
//! This crate provides the types and pure logic shared by the storefront
//! server and the CLI:
//! - `storefront` - Public catalog and admin panel (axum)
//! - `cli` - Operator commands for previewing and auditing the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Everything here can be tested with plain `#[test]`s.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the `Price` type
//! - [`catalog`] - Categories, products and the category-grouped catalog
//! - [`form`] - Typed validation of admin and login form input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod form;
pub mod types;

pub use catalog::{CATEGORY_ORDER, CatalogAudit, Category, CategoryGroup, Product, audit, resolve};
pub use form::{LoginForm, ProductDraft, ProductForm, ProductRecord, ValidationError};
pub use types::*;
