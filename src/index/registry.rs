use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::types::{Criteria, Document, IndexError, Match, MatchSet};

use super::{GroupConfig, IndexGroup};

/// Named index groups. Different groups never contend with each other.
#[derive(Debug, Default)]
pub struct Registry {
    groups: DashMap<String, Arc<IndexGroup>>,
    config: GroupConfig,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose new groups use `config`.
    #[must_use]
    pub fn with_config(config: GroupConfig) -> Self {
        Self {
            groups: DashMap::new(),
            config,
        }
    }

    /// The group called `name`, created with the registry's config if missing.
    pub fn create_or_get_group(&self, name: &str) -> Arc<IndexGroup> {
        let entry = self.groups.entry(name.to_owned()).or_insert_with(|| {
            info!(target: "boolmatch::index", group = name, "index group created");
            Arc::new(IndexGroup::with_config(name, self.config.clone()))
        });
        Arc::clone(entry.value())
    }

    /// # Errors
    ///
    /// Returns [`IndexError::GroupNotFound`] if no group is called `name`.
    pub fn group(&self, name: &str) -> Result<Arc<IndexGroup>, IndexError> {
        self.groups
            .get(name)
            .map(|g| Arc::clone(g.value()))
            .ok_or_else(|| IndexError::GroupNotFound {
                name: name.to_owned(),
            })
    }

    /// Detach a group. Holders of its `Arc` keep a working group.
    pub fn remove_group(&self, name: &str) -> Option<Arc<IndexGroup>> {
        self.groups.remove(name).map(|(_, group)| group)
    }

    /// Group names in ascending order.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|g| g.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// # Errors
    ///
    /// Returns [`IndexError::GroupNotFound`] for an unknown group, or
    /// [`IndexError::Validation`] for a malformed criteria.
    pub fn add_criteria(&self, group: &str, criteria: Criteria) -> Result<(), IndexError> {
        self.group(group)?.add_criteria(criteria)
    }

    /// # Errors
    ///
    /// Same as [`add_criteria`](Self::add_criteria).
    pub fn update_criteria(&self, group: &str, criteria: Criteria) -> Result<(), IndexError> {
        self.group(group)?.update_criteria(criteria)
    }

    /// Returns whether the criteria existed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::GroupNotFound`] for an unknown group.
    pub fn delete_criteria(&self, group: &str, id: &str) -> Result<bool, IndexError> {
        Ok(self.group(group)?.delete_criteria(id))
    }

    /// # Errors
    ///
    /// Returns [`IndexError::GroupNotFound`] for an unknown group, or
    /// [`IndexError::Inconsistent`] from the group search.
    pub fn search(&self, group: &str, doc: &Document) -> Result<MatchSet, IndexError> {
        self.group(group)?.search(doc)
    }

    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub fn search_top(&self, group: &str, doc: &Document, n: usize) -> Result<Vec<Match>, IndexError> {
        self.group(group)?.search_top(doc, n)
    }
}
