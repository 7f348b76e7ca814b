//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod postal_code;
pub mod price;
pub mod product;
pub mod status;

pub use address::Address;
pub use id::*;
pub use postal_code::{PostalCode, PostalCodeError, RegionCode};
pub use price::{CurrencyCode, Price};
pub use product::Product;
pub use status::*;
