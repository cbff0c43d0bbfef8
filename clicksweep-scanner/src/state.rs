use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Whether volume-limited groups are tracked for the whole run or reset at
/// the start of every scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeScope {
    #[default]
    Global,
    PerScope,
}

/// Mutable bookkeeping for one run, owned by the traversal controller and
/// lent to the executor. A fresh value per start URL keeps runs independent.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    volume_scope: VolumeScope,
    covered_groups: HashSet<String>,
    verified: HashSet<String>,
    verified_top_level: HashSet<String>,
    visited_scopes: HashSet<String>,
}

impl RunState {
    pub fn new(volume_scope: VolumeScope) -> Self {
        Self {
            volume_scope,
            ..Self::default()
        }
    }

    pub fn is_group_covered(&self, group: &str) -> bool {
        self.covered_groups.contains(group)
    }

    /// Returns false if the group was already covered.
    pub fn cover_group(&mut self, group: &str) -> bool {
        self.covered_groups.insert(group.to_string())
    }

    pub fn mark_verified(&mut self, text: &str, top_level: bool) {
        self.verified.insert(text.to_string());
        if top_level {
            self.verified_top_level.insert(text.to_string());
        }
    }

    pub fn is_verified(&self, text: &str) -> bool {
        self.verified.contains(text)
    }

    pub fn is_verified_top_level(&self, text: &str) -> bool {
        self.verified_top_level.contains(text)
    }

    /// Returns false if the scope label was visited before.
    pub fn visit_scope(&mut self, label: &str) -> bool {
        self.visited_scopes.insert(label.to_string())
    }

    /// Called when a new scope starts.
    pub fn enter_scope(&mut self) {
        if self.volume_scope == VolumeScope::PerScope {
            self.covered_groups.clear();
        }
    }
}
