//! Looking up linguistic detail for a headword.

use crate::core::{
    EnrichmentResult,
    TangoError,
};

pub mod bunpro;
pub mod page;
pub mod sentence;

pub use bunpro::BunproClient;

pub trait Enricher {
    /// `Ok(None)` means the reference has no entry for `headword`; that is not an error.
    fn enrich(&self, headword: &str) -> Result<Option<EnrichmentResult>, TangoError>;
}

/// Stand-in used when lookups are disabled: every headword is not found.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl Enricher for NoEnrichment {
    fn enrich(&self, _headword: &str) -> Result<Option<EnrichmentResult>, TangoError> {
        Ok(None)
    }
}

impl<E: Enricher + ?Sized> Enricher for Box<E> {
    fn enrich(&self, headword: &str) -> Result<Option<EnrichmentResult>, TangoError> {
        (**self).enrich(headword)
    }
}

impl<E: Enricher + ?Sized> Enricher for &E {
    fn enrich(&self, headword: &str) -> Result<Option<EnrichmentResult>, TangoError> {
        (**self).enrich(headword)
    }
}
