use serde::Deserialize;

use framebridge_core::error::{FrameBridgeError, Result};
use framebridge_core::version::{SdkVersion, DEFAULT_SDK_VERSION, LATEST_RUNTIME_API_VERSION};

use crate::policy::origin::{has_scheme, OriginPattern};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdkConfig {
    pub version: u32,

    #[serde(default)]
    pub origins: OriginSection,

    #[serde(default)]
    pub handshake: HandshakeSection,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            version: 1,
            origins: OriginSection::default(),
            handshake: HandshakeSection::default(),
        }
    }
}

impl SdkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FrameBridgeError::BadConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.origins.validate()?;
        self.handshake.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginSection {
    /// Host patterns trusted over https (`host[:port]`, optional single wildcard label).
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Extra `protocol://host[:port]` patterns supplied by the embedding app.
    #[serde(default)]
    pub additional: Vec<String>,
}

impl Default for OriginSection {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            additional: Vec::new(),
        }
    }
}

impl OriginSection {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_hosts.is_empty() {
            return Err(FrameBridgeError::BadConfig(
                "origins.allowed_hosts must not be empty".into(),
            ));
        }
        for h in &self.allowed_hosts {
            if has_scheme(h) {
                return Err(FrameBridgeError::BadConfig(format!(
                    "origins.allowed_hosts entry must be a bare host: {h}"
                )));
            }
            OriginPattern::https_host(h)?;
        }
        for p in &self.additional {
            OriginPattern::parse(p).map_err(|e| {
                FrameBridgeError::BadConfig(format!("origins.additional entry {p}: {e}"))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandshakeSection {
    /// Version announced in the `initialize` request.
    #[serde(default = "default_sdk_version")]
    pub sdk_version: String,

    #[serde(default = "default_runtime_api_version")]
    pub runtime_api_version: u32,

    /// How long `initialize` waits for the host's reply; 0 waits forever.
    #[serde(default = "default_handshake_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HandshakeSection {
    fn default() -> Self {
        Self {
            sdk_version: default_sdk_version(),
            runtime_api_version: default_runtime_api_version(),
            timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl HandshakeSection {
    pub fn validate(&self) -> Result<()> {
        SdkVersion::parse(&self.sdk_version).map_err(|_| {
            FrameBridgeError::BadConfig(format!(
                "handshake.sdk_version must be major.minor.patch: {}",
                self.sdk_version
            ))
        })?;
        if self.runtime_api_version == 0 {
            return Err(FrameBridgeError::BadConfig(
                "handshake.runtime_api_version must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_sdk_version() -> String {
    DEFAULT_SDK_VERSION.into()
}
fn default_runtime_api_version() -> u32 {
    LATEST_RUNTIME_API_VERSION
}

fn default_handshake_timeout_ms() -> u64 {
    60_000
}

fn default_allowed_hosts() -> Vec<String> {
    BUILTIN_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
}

/// First-party hosts trusted out of the box.
const BUILTIN_ALLOWED_HOSTS: &[&str] = &[
    "teams.microsoft.com",
    "teams.microsoft.us",
    "gov.teams.microsoft.us",
    "dod.teams.microsoft.us",
    "int.teams.microsoft.com",
    "teams.live.com",
    "devspaces.skype.com",
    "ssauth.skype.com",
    "local.teams.live.com",
    "local.teams.live.com:8080",
    "local.teams.office.com",
    "local.teams.office.com:8080",
    "outlook.office.com",
    "outlook-sdf.office.com",
    "outlook.office365.com",
    "outlook-sdf.office365.com",
    "outlook.live.com",
    "outlook-sdf.live.com",
    "*.teams.microsoft.com",
    "*.www.office.com",
    "www.office.com",
    "word.office.com",
    "excel.office.com",
    "powerpoint.office.com",
    "www.officeppe.com",
    "*.www.microsoft365.com",
    "www.microsoft365.com",
    "bing.com",
    "edgeservices.bing.com",
    "www.bing.com",
    "www.staging-bing-int.com",
    "teams.cloud.microsoft",
    "outlook.cloud.microsoft",
    "m365.cloud.microsoft",
];
