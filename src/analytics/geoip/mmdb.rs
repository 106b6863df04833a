//! GeoIP lookup using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Memory-mapped City and ASN databases; the ASN organization stands in for
//! the ISP column.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use super::{GeoError, GeoInfo, GeoResolver};

/// GeoIP lookup service that supports both City and ASN databases
#[derive(Clone)]
pub struct MmdbGeoResolver {
    city_reader: Option<Arc<Reader<Mmap>>>,
    asn_reader: Option<Arc<Reader<Mmap>>>,
}

impl MmdbGeoResolver {
    /// Open the configured databases
    ///
    /// # Arguments
    /// * `city_path` - Optional path to the GeoLite2-City or GeoIP2-City .mmdb file
    /// * `asn_path` - Optional path to the GeoLite2-ASN .mmdb file
    pub fn new(city_path: Option<&str>, asn_path: Option<&str>) -> Result<Self> {
        let city_reader = if let Some(path) = city_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        let asn_reader = if let Some(path) = asn_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP ASN database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self {
            city_reader,
            asn_reader,
        })
    }

    fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, GeoError> {
        let mut info = GeoInfo::default();

        if let Some(ref reader) = self.city_reader {
            if let Ok(result) = reader.lookup(ip) {
                if let Ok(Some(city)) = result.decode::<geoip2::City>() {
                    info.country = city.country.names.english.map(|s| s.to_string());
                    info.state = city
                        .subdivisions
                        .first()
                        .and_then(|subdivision| subdivision.names.english)
                        .map(|s| s.to_string());
                    info.city = city.city.names.english.map(|s| s.to_string());
                }
            }
        }

        if let Some(ref reader) = self.asn_reader {
            if let Ok(result) = reader.lookup(ip) {
                if let Ok(Some(asn)) = result.decode::<geoip2::Asn>() {
                    info.isp = asn.autonomous_system_organization.map(|s| s.to_string());
                }
            }
        }

        if info == GeoInfo::default() {
            return Err(GeoError::NotFound(ip));
        }
        Ok(info)
    }
}

#[async_trait]
impl GeoResolver for MmdbGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<GeoInfo> {
        match self.lookup(ip) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(%ip, error = %e, "MMDB lookup found nothing");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "mmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmdb_resolver_creation_invalid_path() {
        let result = MmdbGeoResolver::new(Some("/nonexistent/path.mmdb"), None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mmdb_resolver_without_databases_resolves_none() {
        let resolver = MmdbGeoResolver::new(None, None).unwrap();
        assert_eq!(resolver.resolve("8.8.8.8".parse().unwrap()).await, None);
    }
}
