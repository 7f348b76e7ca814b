//! Vitrine Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront library, its
//! terminal front-end and the integration tests.
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, postal codes and the
//!   enumerations that drive the cart and checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
