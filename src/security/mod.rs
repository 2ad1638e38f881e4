//! Request security. Currently only CSRF protection.

pub mod csrf;

pub use csrf::{generate_token, generate_true_token, validate_token};
