//! Vitrine storefront library.
//!
//! The cart state manager, the checkout state machine and the clients for
//! the storefront backend. The `vitrine` binary is a thin terminal
//! front-end over this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notify;
pub mod state;
pub mod storage;
