//! Model artifact fetching
//!
//! Downloads model and tokenizer files from the hub with authentication,
//! revision selection, and caching, driven by [`crate::config::ModelArguments`].

mod fetcher;

pub use fetcher::{
    FetchError, FetchOptions, HubFetcher, ModelArtifact, WeightFormat,
};
