//! Canonical request types.
//!
//! A [`NavigationRequest`] can only be produced by the sanitizer (or by
//! [`NavigationRequest::new`], which applies the same clamping), so every
//! downstream component may rely on its invariants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    truncate_chars, MAX_ID_CHARS, MAX_LABEL_CHARS, MAX_OPTIONS_LIMIT, MAX_PATH_DEPTH,
};
use crate::error::InputError;

/// Top-level category being classified within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    PhysicalProducts,
    Services,
    Entertainment,
}

impl Domain {
    pub const ALL: [Domain; 3] = [
        Domain::PhysicalProducts,
        Domain::Services,
        Domain::Entertainment,
    ];

    /// Wire identifier (`level0`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhysicalProducts => "physical-products",
            Self::Services => "services",
            Self::Entertainment => "entertainment",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PhysicalProducts => "Physical Products",
            Self::Services => "Services",
            Self::Entertainment => "Entertainment",
        }
    }

    /// Comma-separated list of accepted identifiers, for error messages.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = InputError;

    /// Case-insensitive after trimming.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| InputError::InvalidDomain {
                value: s.to_string(),
                allowed: Self::allowed_list(),
            })
    }
}

/// One prior drill-down selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    id: String,
    label: String,
}

impl PathStep {
    /// Trim and truncate both fields; `None` if either ends up empty.
    pub fn new(id: &str, label: &str) -> Option<Self> {
        let id = truncate_chars(id.trim(), MAX_ID_CHARS).trim_end();
        let label = truncate_chars(label.trim(), MAX_LABEL_CHARS).trim_end();
        if id.is_empty() || label.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            label: label.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Canonical, immutable navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationRequest {
    domain: Domain,
    path: Vec<PathStep>,
    max_options: u32,
}

impl NavigationRequest {
    /// Build a request, clamping `max_options` into `[1, MAX_OPTIONS_LIMIT]`
    /// and capping the path depth.
    pub fn new(domain: Domain, mut path: Vec<PathStep>, max_options: u32) -> Self {
        path.truncate(MAX_PATH_DEPTH);
        Self {
            domain,
            path,
            max_options: max_options.clamp(1, MAX_OPTIONS_LIMIT),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn path(&self) -> &[PathStep] {
        &self.path
    }

    pub fn max_options(&self) -> u32 {
        self.max_options
    }

    /// Depth of the options being requested (`path.len() + 1`).
    pub fn depth(&self) -> usize {
        self.path.len() + 1
    }

    pub fn path_ids(&self) -> Vec<&str> {
        self.path.iter().map(|s| s.id()).collect()
    }

    pub fn path_labels(&self) -> Vec<String> {
        self.path.iter().map(|s| s.label().to_string()).collect()
    }
}
