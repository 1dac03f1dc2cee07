//! Domain entities for screenlink.
//!
//! Pure types with no I/O.  The relay's registry, router and input pipeline
//! all speak in terms of [`endpoint::EndpointId`] and [`endpoint::Role`].

/// Endpoint identity and role classification.
pub mod endpoint;
