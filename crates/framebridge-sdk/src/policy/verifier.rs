use parking_lot::RwLock;
use tracing::{debug, warn};

use framebridge_core::error::Result;

use super::origin::{Origin, OriginPattern};
use crate::config::OriginSection;

/// Outcome of checking an inbound message origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    /// Same origin as the current window.
    SelfOrigin,
    Allowed,
    Rejected,
}

impl OriginDecision {
    pub fn is_accepted(self) -> bool {
        !matches!(self, OriginDecision::Rejected)
    }
}

/// Session-scoped origin allow-list.
/// Built-in hosts only ever match https; additional patterns carry their own protocol.
pub struct OriginVerifier {
    builtin: Vec<OriginPattern>,
    additional: RwLock<Vec<(String, OriginPattern)>>,
}

impl Clone for OriginVerifier {
    fn clone(&self) -> Self {
        Self {
            builtin: self.builtin.clone(),
            additional: RwLock::new(self.additional.read().clone()),
        }
    }
}

impl OriginVerifier {
    pub fn new(cfg: &OriginSection) -> Result<Self> {
        let builtin = cfg
            .allowed_hosts
            .iter()
            .map(|h| OriginPattern::https_host(h))
            .collect::<Result<Vec<_>>>()?;

        let verifier = Self {
            builtin,
            additional: RwLock::new(Vec::new()),
        };
        verifier.add_additional(&cfg.additional);
        Ok(verifier)
    }

    /// Merge app-supplied patterns. Entries without a protocol or with a bad
    /// host are skipped; duplicates are ignored. Returns how many were added.
    pub fn add_additional(&self, raw: &[String]) -> usize {
        let mut guard = self.additional.write();
        let mut added = 0;
        for s in raw {
            if guard.iter().any(|(existing, _)| existing == s) {
                continue;
            }
            match OriginPattern::parse(s) {
                Ok(p) => {
                    guard.push((s.clone(), p));
                    added += 1;
                }
                Err(e) => warn!(pattern = %s, error = %e, "ignoring invalid additional origin"),
            }
        }
        added
    }

    pub fn additional_patterns(&self) -> Vec<String> {
        self.additional.read().iter().map(|(s, _)| s.clone()).collect()
    }

    /// Check a sender origin. `own_origin` is the current window's origin.
    pub fn evaluate(&self, origin: &str, own_origin: &str) -> OriginDecision {
        if !own_origin.is_empty() && origin == own_origin {
            return OriginDecision::SelfOrigin;
        }

        let Ok(parsed) = Origin::parse(origin) else {
            debug!(%origin, "origin rejected: unparsable");
            return OriginDecision::Rejected;
        };

        if self.additional.read().iter().any(|(_, p)| p.matches(&parsed)) {
            return OriginDecision::Allowed;
        }

        if self.builtin.iter().any(|p| p.matches(&parsed)) {
            return OriginDecision::Allowed;
        }

        debug!(
            %origin,
            additional = ?self.additional_patterns(),
            "origin rejected: not in allow-list"
        );
        OriginDecision::Rejected
    }
}
