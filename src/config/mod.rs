use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::analytics::geoip::CommandSpec;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub geo: GeoConfig,
    pub client_ip: ClientIpConfig,
    pub auth: AuthConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoResolverKind {
    /// External resolver process with a fallback invocation
    Command,
    /// Direct ip-api.com compatible HTTP lookup
    Http,
    /// Local MaxMind databases
    Mmdb,
    None,
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub resolver: GeoResolverKind,
    pub command: CommandSpec,
    pub fallback_command: Option<CommandSpec>,
    pub timeout_secs: u64,
    pub http_endpoint: String,
    pub city_db_path: Option<String>,
    pub asn_db_path: Option<String>,
    /// 0 disables the lookup cache
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket address only
    None,
    /// Trust Forwarded / X-Forwarded-For
    Standard,
    /// Trust CF-Connecting-IP
    Cloudflare,
}

#[derive(Debug, Clone)]
pub struct ClientIpConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
}

impl Default for ClientIpConfig {
    fn default() -> Self {
        Self {
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Keys accepted on the visitor listing; empty leaves it open
    pub admin_api_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    /// If None, uses the embedded assets
    pub static_dir: Option<String>,
}

impl GeoConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_HTTP_ENDPOINT: &'static str = "http://ip-api.com/json";
    const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;
    const SCRIPT: &'static str = "get_location.py";

    /// `python3` first on Unix, `python` first on Windows
    fn default_commands() -> (CommandSpec, CommandSpec) {
        let python3 = CommandSpec::new("python3", &[Self::SCRIPT]);
        let python = CommandSpec::new("python", &[Self::SCRIPT]);
        if cfg!(windows) {
            (python, python3)
        } else {
            (python3, python)
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        let (command, fallback) = Self::default_commands();
        Self {
            resolver: GeoResolverKind::Command,
            command,
            fallback_command: Some(fallback),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            http_endpoint: Self::DEFAULT_HTTP_ENDPOINT.to_string(),
            city_db_path: None,
            asn_db_path: None,
            cache_ttl_secs: 0,
            cache_max_entries: Self::DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl DatabaseBackend {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "sqlite" => DatabaseBackend::Sqlite,
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "mysql" | "mariadb" => DatabaseBackend::Mysql,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres, mysql"
                );
                DatabaseBackend::Sqlite
            }
        }
    }

    fn default_port(self) -> Option<u16> {
        match self {
            DatabaseBackend::Sqlite => None,
            DatabaseBackend::Postgres => Some(5432),
            DatabaseBackend::Mysql => Some(3306),
        }
    }
}

impl DatabaseConfig {
    const DEFAULT_NAME: &'static str = "visitor_tracker";
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    /// Build a connection URL from discrete parts, percent-encoding credentials
    pub fn compose_url(
        backend: DatabaseBackend,
        host: &str,
        port: Option<u16>,
        user: &str,
        password: &str,
        name: &str,
    ) -> anyhow::Result<String> {
        let scheme = match backend {
            DatabaseBackend::Sqlite => return Ok(format!("sqlite://./{name}.db")),
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::Mysql => "mysql",
        };

        let mut url = Url::parse(&format!("{scheme}://{host}"))
            .with_context(|| format!("invalid DB_HOST '{host}'"))?;
        let credentials = url
            .set_username(user)
            .and_then(|_| url.set_password((!password.is_empty()).then_some(password)));
        if credentials.is_err() {
            anyhow::bail!("DB_HOST '{host}' cannot carry credentials");
        }
        url.set_port(port.or(backend.default_port()))
            .map_err(|_| anyhow::anyhow!("DB_HOST '{host}' cannot carry a port"))?;
        url.set_path(&format!("/{name}"));

        Ok(url.into())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_opt(key)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("{key} is not a valid value"))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT")?.unwrap_or(3001),
        };

        let backend = DatabaseBackend::parse(&env_or("DATABASE_BACKEND", "sqlite"));
        let url = match env_opt("DATABASE_URL") {
            Some(url) => url,
            None => DatabaseConfig::compose_url(
                backend,
                &env_or("DB_HOST", "localhost"),
                env_parse("DB_PORT")?,
                &env_or("DB_USER", "root"),
                &env_or("DB_PASSWORD", ""),
                &env_or("DB_NAME", DatabaseConfig::DEFAULT_NAME),
            )?,
        };
        let database = DatabaseConfig {
            backend,
            url,
            max_connections: env_parse("DB_MAX_CONNECTIONS")?
                .unwrap_or(DatabaseConfig::DEFAULT_MAX_CONNECTIONS)
                .max(1),
        };

        let geo = Self::geo_from_env()?;
        let client_ip = Self::client_ip_from_env()?;

        let auth = AuthConfig {
            admin_api_keys: env_opt("ADMIN_API_KEYS")
                .map(|v| split_list(&v).map(str::to_string).collect())
                .unwrap_or_default(),
        };

        let frontend = FrontendConfig {
            static_dir: env_opt("STATIC_DIR"),
        };

        Ok(Config {
            server,
            database,
            geo,
            client_ip,
            auth,
            frontend,
        })
    }

    fn geo_from_env() -> anyhow::Result<GeoConfig> {
        let defaults = GeoConfig::default();

        let resolver = match env_or("GEO_RESOLVER", "command").to_lowercase().as_str() {
            "command" => GeoResolverKind::Command,
            "http" => GeoResolverKind::Http,
            "mmdb" => GeoResolverKind::Mmdb,
            "none" => GeoResolverKind::None,
            other => {
                tracing::warn!(
                    "Unknown GEO_RESOLVER '{other}', falling back to 'command'. Supported values: command, http, mmdb, none"
                );
                GeoResolverKind::Command
            }
        };

        let command = env_opt("GEO_COMMAND")
            .and_then(|v| CommandSpec::parse(&v))
            .unwrap_or(defaults.command);
        let fallback_command = match std::env::var("GEO_FALLBACK_COMMAND") {
            // Explicitly empty disables the fallback
            Ok(v) => CommandSpec::parse(&v),
            Err(_) => defaults.fallback_command,
        };

        let city_db_path = env_opt("GEOIP_CITY_DB_PATH");
        let asn_db_path = env_opt("GEOIP_ASN_DB_PATH");
        if resolver == GeoResolverKind::Mmdb && city_db_path.is_none() && asn_db_path.is_none() {
            anyhow::bail!(
                "GEOIP_CITY_DB_PATH or GEOIP_ASN_DB_PATH must be set when GEO_RESOLVER=mmdb"
            );
        }

        Ok(GeoConfig {
            resolver,
            command,
            fallback_command,
            timeout_secs: env_parse("GEO_TIMEOUT_SECS")?
                .unwrap_or(defaults.timeout_secs)
                .max(1),
            http_endpoint: env_opt("GEO_HTTP_ENDPOINT").unwrap_or(defaults.http_endpoint),
            city_db_path,
            asn_db_path,
            cache_ttl_secs: env_parse("GEO_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl_secs),
            cache_max_entries: env_parse("GEO_CACHE_MAX_ENTRIES")?
                .unwrap_or(defaults.cache_max_entries),
        })
    }

    fn client_ip_from_env() -> anyhow::Result<ClientIpConfig> {
        let trusted_proxy_mode = match env_or("TRUSTED_PROXY_MODE", "none").to_lowercase().as_str() {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = env_opt("TRUSTED_PROXIES")
            .map(|v| {
                split_list(&v)
                    .map(|cidr| {
                        cidr.parse::<IpNet>()
                            .with_context(|| format!("invalid CIDR '{cidr}' in TRUSTED_PROXIES"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(ClientIpConfig {
            trusted_proxy_mode,
            trusted_proxies,
            num_trusted_proxies: env_parse("NUM_TRUSTED_PROXIES")?,
        })
    }
}
