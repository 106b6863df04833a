use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

use super::{GeoError, GeoInfo, GeoResolver};

/// Response body of the ip-api.com JSON endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    isp: Option<String>,
}

/// Direct lookup against an ip-api.com compatible endpoint, no subprocess
pub struct HttpGeoResolver {
    endpoint: String,
    client: Client,
}

impl HttpGeoResolver {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("visitor-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geolocation lookups")?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, GeoError> {
        let body: IpApiResponse = self
            .client
            .get(format!("{}/{}", self.endpoint, ip))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.status != "success" {
            return Err(GeoError::Unsuccessful(body.message));
        }

        Ok(GeoInfo {
            country: body.country,
            state: body.region_name,
            city: body.city,
            isp: body.isp,
        })
    }
}

#[async_trait]
impl GeoResolver for HttpGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<GeoInfo> {
        match self.lookup(ip).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(%ip, error = %e, "HTTP geolocation lookup failed");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
