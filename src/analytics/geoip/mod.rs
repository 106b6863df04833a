//! IP geolocation
//!
//! Resolution is best effort: every [`GeoResolver`] absorbs its own failures,
//! logs them, and answers `None` so the visit is still recorded with
//! `"Unknown"` location fields.

mod cached;
mod command;
mod http;
mod mmdb;

pub use cached::CachedGeoResolver;
pub use command::{CommandGeoResolver, CommandSpec};
pub use http::HttpGeoResolver;
pub use mmdb::MmdbGeoResolver;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{GeoConfig, GeoResolverKind};

/// Location and network provider for an IP address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
}

/// Why a single lookup attempt produced nothing
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("resolver output is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("resolver reported failure: {}", .0.as_deref().unwrap_or("no message"))]
    Unsuccessful(Option<String>),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("no location data for {0}")]
    NotFound(IpAddr),
}

#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolve an IP address; `None` when nothing could be determined
    async fn resolve(&self, ip: IpAddr) -> Option<GeoInfo>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Resolver that never resolves anything (`GEO_RESOLVER=none`)
pub struct NullGeoResolver;

#[async_trait]
impl GeoResolver for NullGeoResolver {
    async fn resolve(&self, _ip: IpAddr) -> Option<GeoInfo> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Build the resolver selected by configuration, wrapped in a cache when enabled
pub fn build_resolver(config: &GeoConfig) -> Result<Arc<dyn GeoResolver>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let resolver: Arc<dyn GeoResolver> = match config.resolver {
        GeoResolverKind::Command => Arc::new(CommandGeoResolver::new(
            config.command.clone(),
            config.fallback_command.clone(),
            timeout,
        )),
        GeoResolverKind::Http => Arc::new(HttpGeoResolver::new(&config.http_endpoint, timeout)?),
        GeoResolverKind::Mmdb => Arc::new(MmdbGeoResolver::new(
            config.city_db_path.as_deref(),
            config.asn_db_path.as_deref(),
        )?),
        GeoResolverKind::None => Arc::new(NullGeoResolver),
    };

    if config.cache_ttl_secs == 0 {
        return Ok(resolver);
    }

    info!(
        ttl_secs = config.cache_ttl_secs,
        max_entries = config.cache_max_entries,
        "Caching geolocation lookups"
    );
    Ok(Arc::new(CachedGeoResolver::new(
        resolver,
        config.cache_max_entries,
        Duration::from_secs(config.cache_ttl_secs),
    )))
}
