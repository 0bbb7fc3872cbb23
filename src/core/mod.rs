pub mod dedup;
pub mod errors;
pub mod http;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use errors::TangoError;
pub use models::{
    EnrichmentResult,
    ExamplePair,
    ProficiencyLevel,
    RawFieldMapping,
    VocabularyRecord,
};
pub use pipeline::{
    FillSummary,
    ImportPipeline,
    ImportSummary,
};
