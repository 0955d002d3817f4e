//! SDK config loader (strict parsing).

pub mod schema;

use std::fs;

use framebridge_core::error::{FrameBridgeError, Result};

pub use schema::{HandshakeSection, OriginSection, SdkConfig};

pub fn load_from_file(path: &str) -> Result<SdkConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| FrameBridgeError::BadConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SdkConfig> {
    let cfg: SdkConfig = serde_yaml::from_str(s)
        .map_err(|e| FrameBridgeError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
