//! Panificación Modelo storefront library.
//!
//! Public catalog, information pages and the admin panel, served by the
//! `panaderia-storefront` binary. Exposed as a library so the integration
//! tests can drive the real router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;
