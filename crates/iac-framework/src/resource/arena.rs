//! Indexed storage for the resource graph.
//!
//! Resources refer to each other by [`ResourceId`]. Parent links, child sets, inherited
//! providers and transformations all live here behind one lock, so inserting a child into
//! its parent's child set is atomic with allocating the child's index.

use super::transformation::ResourceTransformation;
use super::{Resource, ResourceKind};
use crate::output::ResourceId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Everything the arena tracks about one resource besides its handle.
#[derive(Clone, Default)]
pub struct NodeConfig {
    pub parent: Option<ResourceId>,
    /// Providers children inherit, keyed by package.
    pub providers: BTreeMap<String, Resource>,
    /// Inherited transformations followed by the resource's own.
    pub transformations: Vec<ResourceTransformation>,
    pub protect: Option<bool>,
    /// Plugin version and download URL children inherit when they set none.
    pub version: Option<String>,
    pub plugin_download_url: Option<String>,
}

struct ResourceNode {
    resource: Resource,
    config: NodeConfig,
    children: Vec<ResourceId>,
}

#[derive(Default)]
struct ArenaState {
    nodes: Vec<ResourceNode>,
    by_urn: HashMap<String, ResourceId>,
}

#[derive(Default)]
pub struct ResourceArena {
    state: Mutex<ArenaState>,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an index, builds the handle for it and links it under its parent.
    pub fn insert(
        &self,
        config: NodeConfig,
        build: impl FnOnce(ResourceId) -> Resource,
    ) -> Resource {
        let mut state = self.state.lock();
        let key = ResourceId(state.nodes.len() as u32);
        let resource = build(key);
        if let Some(parent) = config.parent {
            if let Some(node) = state.nodes.get_mut(parent.index()) {
                node.children.push(key);
            }
        }
        state.nodes.push(ResourceNode {
            resource: resource.clone(),
            config,
            children: Vec::new(),
        });
        resource
    }

    pub fn len(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: ResourceId) -> Option<Resource> {
        self.with_node(key, |node| node.resource.clone())
    }

    pub fn parent_of(&self, key: ResourceId) -> Option<Resource> {
        let state = self.state.lock();
        let parent = state.nodes.get(key.index())?.config.parent?;
        state.nodes.get(parent.index()).map(|n| n.resource.clone())
    }

    pub fn children_of(&self, key: ResourceId) -> Vec<Resource> {
        let state = self.state.lock();
        let Some(node) = state.nodes.get(key.index()) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|child| state.nodes.get(child.index()))
            .map(|child| child.resource.clone())
            .collect()
    }

    pub fn providers_of(&self, key: ResourceId) -> BTreeMap<String, Resource> {
        self.with_node(key, |node| node.config.providers.clone())
            .unwrap_or_default()
    }

    /// The provider a child of `key` inherits for `resource_type`'s package.
    pub fn provider_for(&self, key: ResourceId, resource_type: &str) -> Option<Resource> {
        let package = super::urn::package_of(resource_type)?;
        self.with_node(key, |node| node.config.providers.get(package).cloned())
            .flatten()
    }

    pub fn transformations_of(&self, key: ResourceId) -> Vec<ResourceTransformation> {
        self.with_node(key, |node| node.config.transformations.clone())
            .unwrap_or_default()
    }

    pub fn protect_of(&self, key: ResourceId) -> Option<bool> {
        self.with_node(key, |node| node.config.protect).flatten()
    }

    /// The plugin version and download URL children of `key` inherit.
    pub fn plugin_of(&self, key: ResourceId) -> (Option<String>, Option<String>) {
        self.with_node(key, |node| {
            (
                node.config.version.clone(),
                node.config.plugin_download_url.clone(),
            )
        })
        .unwrap_or_default()
    }

    /// Records the URN a resource registered under, for resolving wire references.
    pub fn record_urn(&self, key: ResourceId, urn: &str) {
        self.state.lock().by_urn.insert(urn.to_string(), key);
    }

    pub fn find_by_urn(&self, urn: &str) -> Option<Resource> {
        let state = self.state.lock();
        let key = state.by_urn.get(urn)?;
        state.nodes.get(key.index()).map(|n| n.resource.clone())
    }

    /// Expands a dependency set for a registration request.
    ///
    /// Components are replaced by everything they (transitively) parent; the walk stops at
    /// custom resources, whose children are never followed. The result keeps custom-like
    /// resources and remote components. `exclude` and its subtree are skipped, since a
    /// resource cannot wait on itself.
    pub fn transitive_dependencies(
        &self,
        roots: impl IntoIterator<Item = ResourceId>,
        exclude: Option<ResourceId>,
    ) -> BTreeSet<ResourceId> {
        let state = self.state.lock();
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ResourceId> = roots.into_iter().collect();
        while let Some(key) = stack.pop() {
            if Some(key) == exclude || !seen.insert(key) {
                continue;
            }
            let Some(node) = state.nodes.get(key.index()) else {
                continue;
            };
            if node.resource.kind().is_component() {
                stack.extend(node.children.iter().copied());
            }
        }

        seen.into_iter()
            .filter(|key| {
                state.nodes.get(key.index()).is_some_and(|node| {
                    let kind = node.resource.kind();
                    kind.is_custom() || kind == ResourceKind::RemoteComponent
                })
            })
            .collect()
    }

    fn with_node<R>(&self, key: ResourceId, f: impl FnOnce(&ResourceNode) -> R) -> Option<R> {
        let state = self.state.lock();
        state.nodes.get(key.index()).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;

    fn add(arena: &ResourceArena, name: &str, kind: ResourceKind, parent: Option<&Resource>) -> Resource {
        let config = NodeConfig {
            parent: parent.map(Resource::key),
            ..NodeConfig::default()
        };
        arena.insert(config, |key| {
            Resource::new(key, "pkg:index:Thing", name, kind, Output::unknown(), None)
        })
    }

    #[test]
    fn components_expand_to_custom_children() {
        let arena = ResourceArena::new();
        let outer = add(&arena, "outer", ResourceKind::Component, None);
        let inner = add(&arena, "inner", ResourceKind::Component, Some(&outer));
        let a = add(&arena, "a", ResourceKind::Custom, Some(&outer));
        let b = add(&arena, "b", ResourceKind::Custom, Some(&inner));
        let _grandchild = add(&arena, "c", ResourceKind::Custom, Some(&a));
        let remote = add(&arena, "r", ResourceKind::RemoteComponent, Some(&inner));

        let deps = arena.transitive_dependencies([outer.key()], None);
        assert_eq!(deps, BTreeSet::from([a.key(), b.key(), remote.key()]));
    }

    #[test]
    fn excluded_subtree_is_skipped() {
        let arena = ResourceArena::new();
        let outer = add(&arena, "outer", ResourceKind::Component, None);
        let me = add(&arena, "me", ResourceKind::Component, Some(&outer));
        let _mine = add(&arena, "mine", ResourceKind::Custom, Some(&me));
        let sibling = add(&arena, "sibling", ResourceKind::Custom, Some(&outer));

        let deps = arena.transitive_dependencies([outer.key()], Some(me.key()));
        assert_eq!(deps, BTreeSet::from([sibling.key()]));
    }

    #[test]
    fn children_are_linked_on_insert() {
        let arena = ResourceArena::new();
        let parent = add(&arena, "p", ResourceKind::Component, None);
        let child = add(&arena, "c", ResourceKind::Custom, Some(&parent));

        assert_eq!(arena.children_of(parent.key()), vec![child.clone()]);
        assert_eq!(arena.parent_of(child.key()), Some(parent));
    }
}
