//! Geolocation through an external resolver process
//!
//! The process receives the IP as its last argument and prints one JSON
//! object: `{"success": bool, "country"?, "state"?, "city"?, "isp"?}`.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{GeoError, GeoInfo, GeoResolver};

/// Program plus leading arguments; the IP is appended on each invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Split a command line on whitespace; `None` for a blank line
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Process output as printed by the resolver script
#[derive(Debug, Deserialize)]
struct ResolverOutput {
    #[serde(default)]
    success: bool,
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    message: Option<String>,
}

/// Runs the primary command and, if it fails, exactly one fallback command
pub struct CommandGeoResolver {
    primary: CommandSpec,
    fallback: Option<CommandSpec>,
    timeout: Duration,
}

impl CommandGeoResolver {
    pub fn new(primary: CommandSpec, fallback: Option<CommandSpec>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Run one invocation with the configured timeout
    async fn invoke(&self, spec: &CommandSpec, ip: IpAddr) -> Result<GeoInfo, GeoError> {
        let command = spec.to_string();

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .arg(ip.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GeoError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Dropping the wait future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GeoError::Timeout {
                command: command.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| GeoError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GeoError::Exit {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_output(&output.stdout)
    }
}

/// Decode the resolver's stdout; `success: false` is a failure
pub(crate) fn parse_output(stdout: &[u8]) -> Result<GeoInfo, GeoError> {
    let output: ResolverOutput = serde_json::from_slice(stdout)?;

    if !output.success {
        return Err(GeoError::Unsuccessful(output.message));
    }

    Ok(GeoInfo {
        country: output.country,
        state: output.state,
        city: output.city,
        isp: output.isp,
    })
}

#[async_trait]
impl GeoResolver for CommandGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<GeoInfo> {
        let primary_err = match self.invoke(&self.primary, ip).await {
            Ok(info) => return Some(info),
            Err(e) => e,
        };

        let Some(fallback) = self.fallback.as_ref() else {
            warn!(%ip, error = %primary_err, "Geolocation command failed");
            return None;
        };

        debug!(%ip, error = %primary_err, fallback = %fallback, "Primary geolocation command failed, trying fallback");

        match self.invoke(fallback, ip).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(%ip, primary_error = %primary_err, fallback_error = %e, "Both geolocation commands failed");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
