//! Rust client for the eRegulations procedure API
//!
//! This crate provides low-level bindings to an eRegulations instance: the
//! nested objectives tree, procedure details, and keyword search. All calls
//! go through a single retry loop with a fixed inter-attempt delay and a
//! per-call cancellation token, and response bodies are parsed defensively
//! so a garbage payload is distinguishable from an unreachable server.
//!
//! # Example
//!
//! ```no_run
//! use eregulations_api::{EregulationsApi, ResponseBody};
//!
//! # async fn example() -> Result<(), eregulations_api::ApiError> {
//! let api = EregulationsApi::new("https://api-tanzania.tradeportal.org");
//!
//! match api.objectives().await? {
//!     ResponseBody::Parsed(tree) => println!("{} root objectives", tree.as_array().map_or(0, |a| a.len())),
//!     ResponseBody::Malformed { length } => println!("unparseable body ({length} bytes)"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - `GET /Objectives` - Nested objectives/procedures tree
//! - `GET /Procedures/{id}` - Procedure detail
//! - `GET /Procedures/{id}/Resume` - Procedure summary
//! - `GET /Procedures/{id}/Totals` - Cost and time totals
//! - `GET /Procedures/{id}/Steps/{stepId}` - Single step detail
//! - `POST /Objectives/Search` - Keyword search (raw string body)

mod cancel;
mod client;
mod error;
mod types;

pub use cancel::CancelToken;
pub use client::{EregulationsApi, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use error::{ApiError, Result};
pub use types::{RawRecord, RecordLink, ResponseBody, SearchHit};
