//! Cross-crate tests against a running host.

#[cfg(test)]
pub(crate) mod harness;

pub mod lifecycle;
pub mod routing;
pub mod streaming;
