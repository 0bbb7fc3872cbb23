//! Import Japanese vocabulary lists into an Anki collection.
//!
//! Rows come from spreadsheet exports or markdown notes ([`sources`]), are optionally
//! looked up on Bunpro ([`enrichment`]), merged and deduplicated ([`core`]), written
//! through a [`anki::NoteStore`] and sorted into decks by tag ([`routing`]).

pub mod anki;
pub mod core;
pub mod enrichment;
pub mod persistence;
pub mod routing;
pub mod sources;
