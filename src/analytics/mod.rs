//! Visitor enrichment
//!
//! Everything a logged visit is enriched with before it reaches storage:
//! the client IP (with trusted-proxy handling and loopback substitution),
//! geolocation through a pluggable [`GeoResolver`], and the browser/OS/device
//! fingerprint parsed from the User-Agent header.

pub mod geoip;
pub mod ip_extractor;
pub mod user_agent;

pub use geoip::{build_resolver, GeoError, GeoInfo, GeoResolver};
pub use ip_extractor::{extract_client_ip, substitute_loopback, LOOPBACK_SUBSTITUTE};
pub use user_agent::{classify, ClientInfo};
