//! Resilient caching client for eRegulations instances
//!
//! Composes the low-level API bindings with a durable, namespace-isolated
//! expiring store. Every operation follows the same three-tier policy:
//! serve a fresh cache entry, else fetch live and populate the cache, else
//! serve a stale entry with a degradation warning. A remote outage costs
//! freshness, not availability, as long as any cached copy exists.
//!
//! The nested objectives tree is additionally flattened into a globally
//! addressable, path-annotated index so consumers can search procedures
//! without walking the tree themselves.
//!
//! # Example
//!
//! ```no_run
//! use eregulations_client::{ClientConfig, EregulationsClient};
//!
//! # async fn example() -> Result<(), eregulations_client::ClientError> {
//! let client = EregulationsClient::new(ClientConfig {
//!     base_url: Some("https://api-tanzania.tradeportal.org".to_string()),
//!     ..ClientConfig::default()
//! })?;
//!
//! for record in client.list_procedures().await? {
//!     if record.is_leaf_resource {
//!         println!("{} (#{})", record.full_path, record.id);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod flatten;
mod resource;
mod types;

pub use client::{ClientConfig, EregulationsClient, DETAIL_TTL, LIST_TTL};
pub use error::{ClientError, Result};
pub use flatten::{flatten, PATH_SEPARATOR};
pub use resource::ResourceKey;
pub use types::{FlatRecord, ProcedureDetail};

pub use eregulations_api::{ApiError, RawRecord, RecordLink, SearchHit};
