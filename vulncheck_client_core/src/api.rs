//! High-level client facade
//!
//! `VulnCheckClient` wires the executor, token cache, and post-processing
//! together behind the operations callers actually want: entity lookups,
//! NVD record details, and the KEV/threat-actor indexes.

use log::debug;
use serde_json::Value;

use crate::ClientConfig;
use crate::assemble::{self, CveDetails, LookupResult};
use crate::auth::TokenCache;
use crate::batch::{self, AggregatedResult, BatchOptions};
use crate::entity::{self, Entity};
use crate::error::Result;
use crate::json_path;
use crate::queries;
use crate::request::{RESULTS_PATH, RawResult, RequestDescriptor, RequestExecutor};

/// Client for the VulnCheck API
pub struct VulnCheckClient {
    config: ClientConfig,
    executor: RequestExecutor,
}

impl VulnCheckClient {
    /// Create a client from a validated configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let executor = RequestExecutor::new(&config)?;
        Ok(Self { config, executor })
    }

    /// Create a client around an injected token cache
    pub fn with_token_cache(config: ClientConfig, tokens: TokenCache) -> Result<Self> {
        let executor = RequestExecutor::with_token_cache(&config, tokens)?;
        Ok(Self { config, executor })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying executor, for callers composing their own requests
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Execute a single descriptor
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResult> {
        self.executor.execute(descriptor).await
    }

    /// Execute a batch of descriptors with the given options
    pub async fn run_batch(
        &self,
        descriptors: &[RequestDescriptor],
        options: &BatchOptions,
    ) -> Result<Vec<AggregatedResult>> {
        batch::run_batch(&self.executor, descriptors, options).await
    }

    /// Search all indexes for the given entities
    ///
    /// One search request per entity, fanned out under the configured
    /// concurrency limit; empty results are dropped.
    pub async fn search(&self, entities: &[Entity]) -> Result<Vec<AggregatedResult>> {
        let descriptors = queries::search_descriptors(entities);
        let options = BatchOptions::new()
            .with_extraction_path(RESULTS_PATH)
            .with_concurrency_limit(self.config.max_concurrent_lookups);
        self.run_batch(&descriptors, &options).await
    }

    /// Look up entities and assemble one result row per routable entity
    ///
    /// Private, loopback, and link-local addresses are dropped before any
    /// request is made and get no row in the output.
    pub async fn lookup(&self, entities: &[Entity]) -> Result<Vec<LookupResult>> {
        let lookupable = entity::remove_non_routable(entities);
        if lookupable.len() < entities.len() {
            debug!(
                "dropped {} non-routable entities before lookup",
                entities.len() - lookupable.len()
            );
        }
        if lookupable.is_empty() {
            return Ok(Vec::new());
        }
        let aggregated = self.search(&lookupable).await?;
        assemble::assemble_lookup_results(&lookupable, &aggregated)
    }

    /// Fetch the NVD record for a CVE entity as typed details
    ///
    /// Uses the premium index when the configuration enables it, the
    /// community index otherwise. `None` when the index has no record.
    pub async fn cve_details(&self, entity: &Entity) -> Result<Option<CveDetails>> {
        let descriptor = queries::nvd_descriptor(entity, self.config.premium_api);
        let result = self.executor.execute(&descriptor).await?;
        let Some(body) = result.body else {
            return Ok(None);
        };
        match json_path::get_path(&body, "data.0") {
            Some(record) => Ok(Some(CveDetails::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Known-exploited-vulnerability records for a CVE entity
    pub async fn exploits(&self, entity: &Entity) -> Result<Vec<Value>> {
        self.index_records(queries::kev_descriptor(entity)).await
    }

    /// Threat-actor records for a CVE entity
    pub async fn threat_actors(&self, entity: &Entity) -> Result<Vec<Value>> {
        self.index_records(queries::threat_actor_descriptor(entity))
            .await
    }

    async fn index_records(&self, descriptor: RequestDescriptor) -> Result<Vec<Value>> {
        let result = self.executor.execute(&descriptor).await?;
        let records = result
            .body
            .as_ref()
            .and_then(|body| json_path::get_path(body, "data"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(records)
    }
}

impl std::fmt::Debug for VulnCheckClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulnCheckClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_client_requires_api_key() {
        let config = ClientConfig {
            api_key: String::new(),
            ..ClientConfig::test()
        };
        let err = VulnCheckClient::new(config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_client_builds_from_test_config() {
        assert!(VulnCheckClient::new(ClientConfig::test()).is_ok());
    }

    #[test]
    fn test_injected_cache_still_validates_config() {
        let config = ClientConfig {
            max_concurrent_lookups: 0,
            ..ClientConfig::test()
        };
        let err = VulnCheckClient::with_token_cache(config, TokenCache::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
