//! Service layer for the job crawler.
//!
//! This module contains the per-page work of a run:
//! - Browser-like HTTP session (`Transport`)
//! - Retrying payload fetches (`Fetcher`)
//! - Markup and JSON row extraction (`Parser`)
//! - Canonical record construction (`Normalizer`)
//! - Keyword, location and recency filtering (`JobFilter`)

pub mod fetcher;
pub mod filter;
pub mod normalizer;
pub mod parser;
pub mod transport;

pub use fetcher::{Fetcher, RetryPolicy};
pub use filter::JobFilter;
pub use normalizer::Normalizer;
pub use parser::{Parser, Payload};
pub use transport::{HttpSession, PayloadKind, RawResponse, Transport};
