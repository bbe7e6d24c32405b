//! The composing client: namespace-bound store, cache-aside orchestration,
//! and the public operations
//!
//! The remote address is not always known at construction time, so the
//! store opens lazily on first cached call, scoped to the namespace
//! derived from the effective address. Re-pointing the client swaps the
//! whole binding (API handle + store) wholesale, never patching it in
//! place, so readers observe either the old store or the new one.

use crate::error::{ClientError, Result};
use crate::flatten::flatten;
use crate::resource::ResourceKey;
use crate::types::{FlatRecord, ProcedureDetail};
use eregulations_api::{EregulationsApi, RawRecord, ResponseBody, SearchHit};
use file_ttl_cache::{derive_namespace, CacheStats, SweeperHandle, TtlCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// TTL for the flattened procedure list (slowly-changing reference data)
pub const LIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL for detail and sub-resource lookups
pub const DETAIL_TTL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Client configuration
///
/// `base_url` may be left unset and supplied later through
/// [`EregulationsClient::set_base_url`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub cache_enabled: bool,
    /// Root directory for cache namespaces; defaults to a directory under
    /// the system temp dir
    pub cache_dir: Option<PathBuf>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub sweep_interval: Duration,
    pub list_ttl: Duration,
    pub detail_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            cache_enabled: true,
            cache_dir: None,
            max_retries: eregulations_api::DEFAULT_MAX_RETRIES,
            retry_delay: eregulations_api::DEFAULT_RETRY_DELAY,
            request_timeout: Duration::from_secs(30),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            list_ttl: LIST_TTL,
            detail_ttl: DETAIL_TTL,
        }
    }
}

/// The current remote binding: API handle plus its namespace-scoped store
///
/// Replaced wholesale on rebind.
struct Binding {
    api: Arc<EregulationsApi>,
    store: Option<StoreHandle>,
}

struct StoreHandle {
    cache: Arc<TtlCache>,
    _sweeper: SweeperHandle,
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        // Mark the store closed so an in-flight write that still holds the
        // old Arc lands nowhere instead of in a stale namespace.
        self.cache.close();
    }
}

/// Caching client for a single eRegulations instance
pub struct EregulationsClient {
    cache_enabled: bool,
    cache_dir: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
    sweep_interval: Duration,
    list_ttl: Duration,
    detail_ttl: Duration,
    binding: RwLock<Option<Binding>>,
}

impl EregulationsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let cache_dir = config
            .cache_dir
            .unwrap_or_else(|| std::env::temp_dir().join("eregulations-cache"));

        let binding = match config.base_url.as_deref() {
            Some(url) => Some(Binding {
                api: Arc::new(build_api(
                    url,
                    config.request_timeout,
                    config.max_retries,
                    config.retry_delay,
                )?),
                store: None,
            }),
            None => None,
        };

        Ok(Self {
            cache_enabled: config.cache_enabled,
            cache_dir,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            request_timeout: config.request_timeout,
            sweep_interval: config.sweep_interval,
            list_ttl: config.list_ttl,
            detail_ttl: config.detail_ttl,
            binding: RwLock::new(binding),
        })
    }

    /// The currently configured remote address, if any
    pub async fn base_url(&self) -> Option<String> {
        let binding = self.binding.read().await;
        binding.as_ref().map(|b| b.api.base_url().to_string())
    }

    /// Re-point the client at a different eRegulations instance
    ///
    /// Closes the current store and binds a fresh one scoped to the new
    /// address's namespace (opened lazily on the next cached call).
    /// Entries from two addresses are never mixed in one store. An empty
    /// or unparseable address fails and performs no swap.
    pub async fn set_base_url(&self, url: &str) -> Result<()> {
        let api = build_api(url, self.request_timeout, self.max_retries, self.retry_delay)?;

        let mut guard = self.binding.write().await;
        let previous = guard.replace(Binding {
            api: Arc::new(api),
            store: None,
        });
        drop(previous); // old sweeper aborted, old store closed
        info!(base_url = %url, "Rebound client to new remote address");
        Ok(())
    }

    /// Release the current store and its sweeper; idempotent
    pub async fn close(&self) {
        let mut guard = self.binding.write().await;
        if let Some(binding) = guard.as_mut() {
            binding.store = None;
        }
    }

    /// Remove every entry in the current namespace
    pub async fn clear_cache(&self) {
        if let Some(store) = self.store().await {
            store.clear().await;
        }
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match self.store().await {
            Some(store) => Some(store.stats().await),
            None => None,
        }
    }

    /// The flattened, path-annotated procedure list
    pub async fn list_procedures(&self) -> Result<Vec<FlatRecord>> {
        let api = self.api().await?;
        let resource = ResourceKey::Procedures;
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .objectives()
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                let roots: Vec<RawRecord> = decode_body(&resource, body)?;
                Ok(flatten(&roots))
            }
        };
        self.fetch_with_cache(&resource, self.list_ttl, produce).await
    }

    /// Procedure detail, enriched with derived convenience links
    pub async fn get_procedure(&self, id: i64) -> Result<ProcedureDetail> {
        let api = self.api().await?;
        let resource = ResourceKey::Procedure(id);
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .procedure(id)
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                let base = api.base_url();
                Ok(ProcedureDetail {
                    id,
                    // A malformed body surfaces as the sentinel value so the
                    // caller can decide, rather than failing the operation.
                    data: body.into_value(),
                    resume_url: format!("{base}/Procedures/{id}/Resume"),
                    totals_url: format!("{base}/Procedures/{id}/Totals"),
                    steps_base_url: format!("{base}/Procedures/{id}/Steps"),
                })
            }
        };
        self.fetch_with_cache(&resource, self.detail_ttl, produce)
            .await
    }

    /// A single step within a procedure
    pub async fn get_procedure_step(
        &self,
        procedure_id: i64,
        step_id: i64,
    ) -> Result<serde_json::Value> {
        let api = self.api().await?;
        let resource = ResourceKey::ProcedureStep {
            procedure_id,
            step_id,
        };
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .procedure_step(procedure_id, step_id)
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                Ok(body.into_value())
            }
        };
        self.fetch_with_cache(&resource, self.detail_ttl, produce)
            .await
    }

    /// The procedure's summary view
    pub async fn get_procedure_resume(&self, id: i64) -> Result<serde_json::Value> {
        let api = self.api().await?;
        let resource = ResourceKey::ProcedureResume(id);
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .procedure_resume(id)
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                Ok(body.into_value())
            }
        };
        self.fetch_with_cache(&resource, self.detail_ttl, produce)
            .await
    }

    /// The procedure's cost and time totals
    pub async fn get_procedure_totals(&self, id: i64) -> Result<serde_json::Value> {
        let api = self.api().await?;
        let resource = ResourceKey::ProcedureTotals(id);
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .procedure_totals(id)
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                Ok(body.into_value())
            }
        };
        self.fetch_with_cache(&resource, self.detail_ttl, produce)
            .await
    }

    /// Keyword search across procedures
    ///
    /// Hits that fail to decode individually are skipped, not fatal; the
    /// remote occasionally emits partial records.
    pub async fn search_procedures(&self, keyword: &str) -> Result<Vec<SearchHit>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ClientError::Config(
                "search keyword must not be empty".to_string(),
            ));
        }

        let api = self.api().await?;
        let resource = ResourceKey::search(keyword);
        let keyword = keyword.to_string();
        let produce = {
            let resource = resource.clone();
            async move {
                let body = api
                    .search(&keyword)
                    .await
                    .map_err(|e| ClientError::fetch(&resource, e))?;
                let value = match body {
                    ResponseBody::Parsed(v) => v,
                    ResponseBody::Malformed { length } => {
                        return Err(ClientError::data(
                            &resource,
                            format!("malformed response body ({length} bytes)"),
                        ))
                    }
                };
                let items = value.as_array().ok_or_else(|| {
                    ClientError::data(&resource, "expected a flat array of search hits")
                })?;
                let hits = items
                    .iter()
                    .filter_map(|item| match serde_json::from_value(item.clone()) {
                        Ok(hit) => Some(hit),
                        Err(e) => {
                            debug!(error = %e, "Skipping undecodable search hit");
                            None
                        }
                    })
                    .collect();
                Ok(hits)
            }
        };
        self.fetch_with_cache(&resource, self.detail_ttl, produce)
            .await
    }

    /// Cache-aside with stale-on-error fallback
    ///
    /// Tiers: fresh cache hit, else live fetch (populating the cache),
    /// else a stale entry with a degradation warning, else the original
    /// error. With caching disabled there are no cache reads of any kind,
    /// the stale tier included.
    ///
    /// Concurrent misses for the same key are not coalesced: both fetch
    /// and both write, last writer wins. Acceptable for read-mostly
    /// reference data.
    async fn fetch_with_cache<T, F>(
        &self,
        resource: &ResourceKey,
        ttl: Duration,
        produce: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T>>,
    {
        let key = resource.to_string();
        let store = self.store().await;

        if let Some(store) = &store {
            if let Some(value) = store.get(&key).await {
                match serde_json::from_value(value) {
                    Ok(decoded) => {
                        debug!(resource = %key, "Serving fresh cache entry");
                        return Ok(decoded);
                    }
                    Err(e) => {
                        debug!(resource = %key, error = %e, "Cached value undecodable, refetching")
                    }
                }
            }
        }

        match produce.await {
            Ok(value) => {
                if let Some(store) = &store {
                    match serde_json::to_value(&value) {
                        Ok(serialized) => store.set(&key, serialized, ttl).await,
                        Err(e) => {
                            warn!(resource = %key, error = %e, "Value not serializable for caching")
                        }
                    }
                }
                Ok(value)
            }
            Err(err) => {
                if let Some(store) = &store {
                    if let Some(value) = store.get_with_expired(&key).await {
                        if let Ok(decoded) = serde_json::from_value(value) {
                            warn!(
                                resource = %key,
                                error = %err,
                                "Remote fetch failed, serving stale cache entry"
                            );
                            return Ok(decoded);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn api(&self) -> Result<Arc<EregulationsApi>> {
        let binding = self.binding.read().await;
        binding
            .as_ref()
            .map(|b| Arc::clone(&b.api))
            .ok_or_else(|| ClientError::Config("remote base URL is not configured".to_string()))
    }

    /// The current store, opening it lazily; `None` when caching is
    /// disabled or no remote address is configured yet
    async fn store(&self) -> Option<Arc<TtlCache>> {
        if !self.cache_enabled {
            return None;
        }

        {
            let guard = self.binding.read().await;
            let binding = guard.as_ref()?;
            if let Some(handle) = &binding.store {
                return Some(Arc::clone(&handle.cache));
            }
        }

        let mut guard = self.binding.write().await;
        let binding = guard.as_mut()?;
        if binding.store.is_none() {
            let namespace = derive_namespace(binding.api.base_url());
            let cache = Arc::new(TtlCache::open(&self.cache_dir, &namespace).await);
            let sweeper = cache.spawn_sweeper(self.sweep_interval);
            binding.store = Some(StoreHandle {
                cache,
                _sweeper: sweeper,
            });
        }
        binding.store.as_ref().map(|h| Arc::clone(&h.cache))
    }
}

fn build_api(
    url: &str,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<EregulationsApi> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Config(
            "remote base URL must not be empty".to_string(),
        ));
    }
    reqwest::Url::parse(trimmed)
        .map_err(|e| ClientError::Config(format!("invalid remote base URL '{trimmed}': {e}")))?;

    Ok(EregulationsApi::with_timeout(trimmed, timeout).retry_policy(max_retries, retry_delay))
}

fn decode_body<T: DeserializeOwned>(resource: &ResourceKey, body: ResponseBody) -> Result<T> {
    match body {
        ResponseBody::Parsed(value) => serde_json::from_value(value)
            .map_err(|e| ClientError::data(resource, format!("unexpected shape: {e}"))),
        ResponseBody::Malformed { length } => Err(ClientError::data(
            resource,
            format!("malformed response body ({length} bytes)"),
        )),
    }
}
