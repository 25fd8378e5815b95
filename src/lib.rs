// src/lib.rs

//! jobcrawler library
//!
//! Fetches RemoteOK listings (HTML pages or the JSON feed) through a
//! browser-like session and emits normalized, deduplicated job records.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
