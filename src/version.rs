//! Best-effort check for a newer published release.
//!
//! The check runs before the command and must never get in the way: any
//! failure (offline, registry down, unparseable response) is logged at debug
//! level and swallowed. Pre-release and yanked versions are ignored.

use anyhow::Context;
use console::style;
use serde_json::Value;

const REGISTRY_URL: &str = "https://crates.io/api/v1/crates/torque";

/// Registry client for the published-version lookup.
pub struct VersionCheckService {
    current: String,
    registry_url: String,
}

impl VersionCheckService {
    pub fn new(current: &str) -> Self {
        Self { current: current.to_string(), registry_url: REGISTRY_URL.to_string() }
    }

    /// Service against an explicit registry URL, for tests.
    pub fn with_registry_url(current: &str, registry_url: &str) -> Self {
        Self { current: current.to_string(), registry_url: registry_url.to_string() }
    }

    /// Print an upgrade hint to stderr when a newer release exists. Never
    /// fails and never writes to stdout.
    pub async fn check_for_newer_release(&self) {
        match self.latest_newer_release().await {
            Ok(Some(latest)) => {
                eprintln!(
                    "{}",
                    style(format!(
                        "A newer version of the Torque CLI is available: {latest} (installed: {}). \
                         Upgrade with 'cargo install torque'.",
                        self.current
                    ))
                    .yellow()
                );
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("version check skipped: {:#}", e),
        }
    }

    async fn latest_newer_release(&self) -> anyhow::Result<Option<String>> {
        let current = parse_version(&self.current)
            .with_context(|| format!("installed version '{}' is not x.y.z", self.current))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("torque-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let info: Value = client
            .get(&self.registry_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let latest = latest_release(&info).context("registry lists no usable release")?;
        let parsed = parse_version(&latest).context("registry release is not x.y.z")?;
        Ok((parsed > current).then_some(latest))
    }
}

/// Newest non-yanked stable release listed by the registry.
fn latest_release(info: &Value) -> Option<String> {
    info.get("versions")?
        .as_array()?
        .iter()
        .filter(|v| !v.get("yanked").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|v| v.get("num").and_then(Value::as_str))
        .filter_map(|num| parse_version(num).map(|parsed| (parsed, num.to_string())))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, num)| num)
}

/// Parse `x.y.z` into a comparable tuple. Anything else, including
/// pre-release suffixes, parses to `None`.
fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
