//! Origin pattern compilation and matching.
//!
//! A pattern is `protocol://host[:port]` where the host may contain a single
//! `*` label standing for exactly one DNS label. Matching is label-by-label
//! with equal label counts, so `*.example.com` never matches `a.b.example.com`
//! and `example.com` never matches `example.com.evil.com`.

use url::Url;

use framebridge_core::error::{FrameBridgeError, Result};

/// Compiled allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    /// Scheme including the trailing colon (`https:`), as browsers report it.
    pub protocol: String,
    /// Host template, lowercase, possibly with one `*` label.
    pub host: String,
    /// Required port; `None` only matches origins without an explicit port.
    pub port: Option<u16>,
}

/// Sender origin split into comparable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    pub fn parse(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| FrameBridgeError::BadRequest(format!("invalid origin {s}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| FrameBridgeError::BadRequest(format!("origin has no host: {s}")))?;
        Ok(Self {
            protocol: format!("{}:", url.scheme()),
            host: host.to_ascii_lowercase(),
            port: url.port(),
        })
    }
}

impl OriginPattern {
    /// Parse a user-supplied pattern. Patterns without an explicit scheme are refused.
    pub fn parse(s: &str) -> Result<Self> {
        if !has_scheme(s) {
            return Err(FrameBridgeError::BadRequest(format!(
                "origin pattern must start with a protocol: {s}"
            )));
        }
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| FrameBridgeError::BadRequest(format!("origin pattern must start with a protocol: {s}")))?;
        let (host, port) = split_host_port(rest.strip_suffix('/').unwrap_or(rest))?;
        Ok(Self {
            protocol: format!("{}:", scheme.to_ascii_lowercase()),
            host,
            port,
        })
    }

    /// Compile a bare built-in host entry; the protocol is always https.
    pub fn https_host(s: &str) -> Result<Self> {
        let (host, port) = split_host_port(s)?;
        Ok(Self {
            protocol: "https:".into(),
            host,
            port,
        })
    }

    pub fn matches(&self, origin: &Origin) -> bool {
        self.protocol == origin.protocol
            && self.port == origin.port
            && validate_host_against_pattern(&self.host, &origin.host)
    }
}

/// `^[A-Za-z][A-Za-z\d+.-]*://`
pub fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Compare a host against a host template, one label at a time.
///
/// A `*` label matches any single label, at most once per pattern, and never in
/// the last (top-level domain) position.
pub fn validate_host_against_pattern(pattern: &str, host: &str) -> bool {
    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();

    if pattern_labels.len() != host_labels.len() {
        return false;
    }

    let last = pattern_labels.len() - 1;
    let mut used_wildcard = false;
    for (i, (p, h)) in pattern_labels.iter().zip(host_labels.iter()).enumerate() {
        if p == h {
            continue;
        }
        if *p != "*" || h.is_empty() {
            return false;
        }
        if i == last || used_wildcard {
            return false;
        }
        used_wildcard = true;
    }

    true
}

/// `true` when any pattern accepts the candidate origin string.
pub fn is_allowed(candidate: &str, patterns: &[OriginPattern]) -> bool {
    match Origin::parse(candidate) {
        Ok(origin) => patterns.iter().any(|p| p.matches(&origin)),
        Err(_) => false,
    }
}

fn split_host_port(s: &str) -> Result<(String, Option<u16>)> {
    let (host, port) = match s.rsplit_once(':') {
        Some((h, p)) => {
            let port: u16 = p
                .parse()
                .map_err(|_| FrameBridgeError::BadRequest(format!("invalid port in origin pattern: {s}")))?;
            (h, Some(port))
        }
        None => (s, None),
    };
    if host.is_empty() || host.contains('/') || host.split('.').any(str::is_empty) {
        return Err(FrameBridgeError::BadRequest(format!("invalid host in origin pattern: {s}")));
    }
    Ok((host.to_ascii_lowercase(), port))
}
