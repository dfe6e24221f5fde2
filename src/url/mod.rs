//! URL handling utilities

mod normalize;

pub use normalize::normalize;
