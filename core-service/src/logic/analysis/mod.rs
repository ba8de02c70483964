//! Analysis Module - single URL pipeline
//!
//! # Components
//! - `collaborators.rs`: Fetch / extract / persist interfaces
//! - `fetcher.rs`: reqwest page fetcher
//! - `extractor.rs`: Heuristic signal extractor
//! - `worker.rs`: AnalysisWorker (fetch → extract → fuse)
//! - `error.rs`: Error taxonomy

pub mod collaborators;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborators::{
    ArtifactKind, ArtifactStore, FetchedPage, NullArtifactStore, PageFetcher, SignalExtractor,
};
pub use error::{AnalysisError, ErrorKind, ExtractionError, FetchError, StoreError};
pub use extractor::HeuristicExtractor;
pub use fetcher::{FetchConfig, HttpFetcher};
pub use worker::AnalysisWorker;
