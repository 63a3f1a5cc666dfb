//! Resources shared between applications.
//!
//! Applications publish and consume values through a [`ResourcePool`]
//! scoped to the owning session. The pool itself lives outside the loading
//! core; this module only fixes the interface the core relies on, plus a
//! simple in-memory pool used by embedders and tests.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::package::{RequiredResources, ResourceRequirement};

/// Identity of a resource within a pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    /// Owning pool.
    pub pool_id: String,

    /// Resource name.
    pub name: String,

    /// Note the resource is scoped to, if any.
    pub note_id: Option<String>,

    /// Paragraph the resource is scoped to, if any.
    pub paragraph_id: Option<String>,
}

impl ResourceId {
    /// Create a pool-wide resource id.
    pub fn new(pool_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            name: name.into(),
            note_id: None,
            paragraph_id: None,
        }
    }

    /// Scope the id to a note and paragraph.
    pub fn scoped(
        mut self,
        note_id: impl Into<String>,
        paragraph_id: impl Into<String>,
    ) -> Self {
        self.note_id = Some(note_id.into());
        self.paragraph_id = Some(paragraph_id.into());
        self
    }
}

/// A value stored in a resource pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource identity.
    pub id: ResourceId,

    /// Type name of the value, used by `:TypeName` requirements.
    pub type_name: String,

    /// The value itself.
    pub value: serde_json::Value,
}

impl Resource {
    /// Create a resource.
    pub fn new(id: ResourceId, type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            value,
        }
    }

    fn satisfies(&self, requirement: &ResourceRequirement) -> bool {
        match requirement {
            ResourceRequirement::Named(name) => self.id.name == *name,
            ResourceRequirement::OfType(type_name) => self.type_name == *type_name,
        }
    }
}

/// An ordered collection of resources.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate over the resources.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Look a resource up by name.
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id.name == name)
    }

    /// Keep resources that belong to the note, or to no note at all.
    pub fn filter_by_note_id(self, note_id: &str) -> Self {
        self.retain(|r| r.id.note_id.as_deref().map_or(true, |n| n == note_id))
    }

    /// Keep resources that belong to the paragraph, or to no paragraph at all.
    pub fn filter_by_paragraph_id(self, paragraph_id: &str) -> Self {
        self.retain(|r| {
            r.id.paragraph_id
                .as_deref()
                .map_or(true, |p| p == paragraph_id)
        })
    }

    fn retain(mut self, keep: impl Fn(&Resource) -> bool) -> Self {
        self.resources.retain(|r| keep(r));
        self
    }

    /// Pick the first alternative fully satisfied by this set.
    ///
    /// Returns `None` when no alternative can be satisfied.
    pub fn select(&self, required: &RequiredResources) -> Option<ResourceSet> {
        if required.alternatives().is_empty() {
            return Some(ResourceSet::new());
        }

        required.alternatives().iter().find_map(|alternative| {
            let mut selected = ResourceSet::new();
            for requirement in alternative {
                let found = self.resources.iter().find(|r| r.satisfies(requirement))?;
                selected.push(found.clone());
            }
            Some(selected)
        })
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

/// Key-value store shared by the applications of one session.
pub trait ResourcePool: Send + Sync {
    /// Pool identity.
    fn id(&self) -> &str;

    /// Get a pool-wide resource by name.
    fn get(&self, name: &str) -> Option<Resource>;

    /// Get a resource scoped to a note and paragraph.
    fn get_scoped(&self, note_id: &str, paragraph_id: &str, name: &str) -> Option<Resource>;

    /// Store a resource, replacing any resource with the same id.
    fn put(&self, resource: Resource);

    /// Remove a resource.
    fn remove(&self, id: &ResourceId) -> Option<Resource>;

    /// Snapshot every resource in the pool.
    fn all(&self) -> ResourceSet;
}

/// In-memory resource pool.
pub struct LocalResourcePool {
    id: String,
    resources: RwLock<BTreeMap<ResourceId, Resource>>,
}

impl LocalResourcePool {
    /// Create an empty pool.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resources: RwLock::new(BTreeMap::new()),
        }
    }
}

impl ResourcePool for LocalResourcePool {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, name: &str) -> Option<Resource> {
        self.resources
            .read()
            .get(&ResourceId::new(self.id.clone(), name))
            .cloned()
    }

    fn get_scoped(&self, note_id: &str, paragraph_id: &str, name: &str) -> Option<Resource> {
        let id = ResourceId::new(self.id.clone(), name).scoped(note_id, paragraph_id);
        self.resources.read().get(&id).cloned()
    }

    fn put(&self, resource: Resource) {
        self.resources.write().insert(resource.id.clone(), resource);
    }

    fn remove(&self, id: &ResourceId) -> Option<Resource> {
        self.resources.write().remove(id)
    }

    fn all(&self) -> ResourceSet {
        self.resources.read().values().cloned().collect()
    }
}
