//! Data types flowing through the pipeline.

pub mod classify;
pub mod fetch;
pub mod record;
pub mod request;

pub use classify::{Classification, ContentDomain, Detection, Granularity};
pub use fetch::{FetchMethod, RawFetchResult};
pub use record::{
    is_empty_value, Citation, EnrichmentContext, ExtractedRecord, FieldMap, Provenance,
    SearchSource,
};
pub use request::ExtractionRequest;
