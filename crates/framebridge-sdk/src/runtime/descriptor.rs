//! Negotiated runtime capability descriptor.
//!
//! A descriptor is built once per session and then only ever shared behind an
//! `Arc`; no public method hands out mutable access, so every reader sees the
//! value that was negotiated.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use framebridge_core::error::{FrameBridgeError, Result};

/// Capability tree: presence of a key means supported, children are sub-capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    children: BTreeMap<String, CapabilitySet>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `supports` object. `null` entries are absent; any other
    /// non-object value counts as a supported leaf.
    pub fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::Object(map) => {
                let mut children = BTreeMap::new();
                for (k, child) in map {
                    match child {
                        Value::Null => {}
                        Value::Object(_) => {
                            children.insert(k.clone(), CapabilitySet::from_value(child)?);
                        }
                        _ => {
                            children.insert(k.clone(), CapabilitySet::new());
                        }
                    }
                }
                Ok(Self { children })
            }
            Value::Null => Ok(Self::new()),
            other => Err(FrameBridgeError::MalformedHandshake(format!(
                "supports must be an object, got {other}"
            ))),
        }
    }

    /// Build from dotted paths such as `dialog.bot`.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::new();
        for p in paths {
            set.insert_path(p);
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&CapabilitySet> {
        self.children.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// `true` if every segment of `path` is present, walking from this node.
    pub fn contains_path(&self, path: &[&str]) -> bool {
        let mut node = self;
        for seg in path {
            match node.children.get(*seg) {
                Some(next) => node = next,
                None => return false,
            }
        }
        true
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .children
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        Value::Object(map)
    }

    pub(crate) fn insert_path(&mut self, dotted: &str) {
        let mut node = self;
        for seg in dotted.split('.').filter(|s| !s.is_empty()) {
            node = node.children.entry(seg.to_string()).or_default();
        }
    }

    /// Recursive union.
    pub(crate) fn merge(&mut self, other: &CapabilitySet) {
        for (k, v) in &other.children {
            self.children.entry(k.clone()).or_default().merge(v);
        }
    }
}

/// Runtime descriptor as negotiated with, or synthesized for, the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    api_version: u32,
    is_legacy: bool,
    supports: CapabilitySet,
}

impl RuntimeDescriptor {
    pub fn new(api_version: u32, is_legacy: bool, supports: CapabilitySet) -> Self {
        Self {
            api_version,
            is_legacy,
            supports,
        }
    }

    /// Parse a host-supplied descriptor. `apiVersion` must be a positive integer.
    pub fn from_value(v: &Value) -> Result<Self> {
        let obj = v
            .as_object()
            .ok_or_else(|| FrameBridgeError::MalformedHandshake("runtime config is not an object".into()))?;

        let api_version = obj
            .get("apiVersion")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| FrameBridgeError::MalformedHandshake("runtime config has no valid apiVersion".into()))?;

        let is_legacy = obj.get("isLegacyTeams").and_then(Value::as_bool).unwrap_or(false);
        let supports = CapabilitySet::from_value(obj.get("supports").unwrap_or(&Value::Null))?;

        Ok(Self::new(api_version, is_legacy, supports))
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn is_legacy(&self) -> bool {
        self.is_legacy
    }

    pub fn supports(&self) -> &CapabilitySet {
        &self.supports
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("apiVersion".into(), Value::from(self.api_version));
        if self.is_legacy {
            map.insert("isLegacyTeams".into(), Value::Bool(true));
        }
        map.insert("supports".into(), self.supports.to_value());
        Value::Object(map)
    }
}
