//! Dependency Graph Module
//!
//! Tracks which cache keys were derived from which source resources, so a
//! resource change can fan out to the results computed from it.

use std::collections::{HashMap, HashSet};

// == Dependency Graph ==
/// Directed edges from resource ids to the cache keys derived from them.
///
/// Edges exist only through explicit registration and fan out exactly one
/// level; dependents of dependents are not chased.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// resource id -> keys derived from it
    dependents: HashMap<String, HashSet<String>>,
    /// dependent key -> resources it was registered against
    resources: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Records that `dependent` was derived from `resources`, replacing any
    /// previous registration for that key.
    pub fn register(&mut self, dependent: &str, resources: Vec<String>) {
        self.unregister(dependent);
        for resource in resources {
            self.dependents
                .entry(resource.clone())
                .or_default()
                .insert(dependent.to_string());
            self.resources
                .entry(dependent.to_string())
                .or_default()
                .insert(resource);
        }
    }

    // == Unregister ==
    /// Drops `dependent`'s registration entirely.
    pub fn unregister(&mut self, dependent: &str) {
        if let Some(resources) = self.resources.remove(dependent) {
            for resource in resources {
                if let Some(keys) = self.dependents.get_mut(&resource) {
                    keys.remove(dependent);
                    if keys.is_empty() {
                        self.dependents.remove(&resource);
                    }
                }
            }
        }
    }

    // == Lookup ==
    /// Keys registered as derived from `resource`. One level only.
    pub fn dependents_of(&self, resource: &str) -> Vec<String> {
        self.dependents
            .get(resource)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of keys with a live registration.
    pub fn registered_count(&self) -> usize {
        self.resources.len()
    }

    // == Clear ==
    /// Drops every edge.
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.resources.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_register_and_lookup() {
        let mut graph = DependencyGraph::new();
        graph.register(
            "search:TODO",
            vec!["/src/a.rs".to_string(), "/src/b.rs".to_string()],
        );

        assert_eq!(graph.dependents_of("/src/a.rs"), vec!["search:TODO"]);
        assert_eq!(graph.dependents_of("/src/b.rs"), vec!["search:TODO"]);
        assert!(graph.dependents_of("/src/c.rs").is_empty());
    }

    #[test]
    fn test_multiple_dependents_per_resource() {
        let mut graph = DependencyGraph::new();
        graph.register("search:TODO", vec!["/src/a.rs".to_string()]);
        graph.register("search:FIXME", vec!["/src/a.rs".to_string()]);

        assert_eq!(
            sorted(graph.dependents_of("/src/a.rs")),
            vec!["search:FIXME", "search:TODO"]
        );
    }

    #[test]
    fn test_reregistration_replaces_edges() {
        let mut graph = DependencyGraph::new();
        graph.register("search:TODO", vec!["/src/old.rs".to_string()]);
        graph.register("search:TODO", vec!["/src/new.rs".to_string()]);

        assert!(graph.dependents_of("/src/old.rs").is_empty());
        assert_eq!(graph.dependents_of("/src/new.rs"), vec!["search:TODO"]);
        assert_eq!(graph.registered_count(), 1);
    }

    #[test]
    fn test_unregister_cleans_both_directions() {
        let mut graph = DependencyGraph::new();
        graph.register("search:TODO", vec!["/src/a.rs".to_string()]);
        graph.unregister("search:TODO");

        assert!(graph.dependents_of("/src/a.rs").is_empty());
        assert_eq!(graph.registered_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_key_is_a_no_op() {
        let mut graph = DependencyGraph::new();
        graph.register("search:TODO", vec!["/src/a.rs".to_string()]);
        graph.unregister("search:UNKNOWN");

        assert_eq!(graph.dependents_of("/src/a.rs"), vec!["search:TODO"]);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut graph = DependencyGraph::new();
        graph.register("a", vec!["r1".to_string()]);
        graph.register("b", vec!["r1".to_string(), "r2".to_string()]);
        graph.clear();

        assert!(graph.dependents_of("r1").is_empty());
        assert!(graph.dependents_of("r2").is_empty());
        assert_eq!(graph.registered_count(), 0);
    }
}
