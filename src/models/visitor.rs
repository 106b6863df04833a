use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analytics::{ClientInfo, GeoInfo};

/// Fallback for every text column that could not be determined
pub const UNKNOWN: &str = "Unknown";

/// Device type recorded when the classifier reports nothing more specific
pub const DEFAULT_DEVICE_TYPE: &str = "Desktop";

const IP_ADDRESS_MAX: usize = 45;
const LOCATION_MAX: usize = 100;
const ISP_MAX: usize = 255;
const CLIENT_LABEL_MAX: usize = 100;
const SHORT_FIELD_MAX: usize = 50;

/// A logged visit as stored in the `visitors` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VisitorRecord {
    pub id: i64,
    pub ip_address: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub isp: String,
    pub browser_name: String,
    pub operating_system: String,
    pub device_type: String,
    pub screen_resolution: String,
    pub visit_time: DateTime<Utc>,
}

/// A visit ready to be appended; `id` and `visit_time` are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisitor {
    pub ip_address: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub isp: String,
    pub browser_name: String,
    pub operating_system: String,
    pub device_type: String,
    pub screen_resolution: String,
}

impl NewVisitor {
    /// Compose a visit from the enrichment results.
    ///
    /// Missing or blank values fall back to [`UNKNOWN`] (or [`DEFAULT_DEVICE_TYPE`]),
    /// and every field is cut to its column width so the insert cannot be
    /// rejected for length.
    pub fn compose(
        ip_address: &str,
        geo: Option<&GeoInfo>,
        client: &ClientInfo,
        screen_resolution: Option<&str>,
    ) -> Self {
        let geo_field = |pick: fn(&GeoInfo) -> Option<&str>, max: usize| {
            fit(geo.and_then(pick), UNKNOWN, max)
        };

        Self {
            ip_address: fit(Some(ip_address), UNKNOWN, IP_ADDRESS_MAX),
            country: geo_field(|g| g.country.as_deref(), LOCATION_MAX),
            state: geo_field(|g| g.state.as_deref(), LOCATION_MAX),
            city: geo_field(|g| g.city.as_deref(), LOCATION_MAX),
            isp: geo_field(|g| g.isp.as_deref(), ISP_MAX),
            browser_name: fit(Some(&client.browser_label()), UNKNOWN, CLIENT_LABEL_MAX),
            operating_system: fit(Some(&client.os_label()), UNKNOWN, CLIENT_LABEL_MAX),
            device_type: fit(
                Some(&client.device_type),
                DEFAULT_DEVICE_TYPE,
                SHORT_FIELD_MAX,
            ),
            screen_resolution: fit(screen_resolution, UNKNOWN, SHORT_FIELD_MAX),
        }
    }
}

/// Trim, substitute the fallback for blanks, and truncate on a char boundary
fn fit(value: Option<&str>, fallback: &str, max_chars: usize) -> String {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(fallback);
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}
