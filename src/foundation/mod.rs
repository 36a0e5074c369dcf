/// Frame, rate and screen primitives.
pub mod core;
/// Crate error type.
pub mod error;
/// Callback and object identities.
pub mod ids;
