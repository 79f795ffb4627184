//! Utility functions for class names and dependency tracking

/// Class name helpers
///
/// Class names are namespace paths separated by `\`, e.g. `App\Controller\Users`.
/// A leading separator (fully-qualified form) is accepted everywhere and
/// stripped before lookup.
pub mod naming {
    /// Namespace separator used in class names.
    pub const SEPARATOR: char = '\\';

    /// Strips the leading separator of a fully-qualified class name.
    ///
    /// # Examples
    ///
    /// ```
    /// use evoke_core::utils::naming::normalize;
    ///
    /// assert_eq!(normalize("\\App\\Users"), "App\\Users");
    /// assert_eq!(normalize("App\\Users"), "App\\Users");
    /// ```
    pub fn normalize(name: &str) -> &str {
        name.trim_start_matches(SEPARATOR)
    }
}

/// Dependency tracking utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet};

    /// Tracks the classes being constructed by one `make` call.
    ///
    /// Unlike a shared tracker this lives on the stack of a single resolution,
    /// so concurrent `make` calls never see each other's frames. The order of
    /// entries is the construction chain, outermost first.
    #[derive(Debug, Default)]
    pub struct ResolutionStack {
        frames: Vec<String>,
    }

    impl ResolutionStack {
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if a class is currently being constructed.
        pub fn contains(&self, name: &str) -> bool {
            self.frames.iter().any(|frame| frame == name)
        }

        /// Pushes a class onto the chain.
        ///
        /// Returns `false` if the class was already on the chain (cycle).
        pub fn enter(&mut self, name: &str) -> bool {
            if self.contains(name) {
                return false;
            }
            self.frames.push(name.to_string());
            true
        }

        /// Pops the innermost class.
        pub fn leave(&mut self) {
            self.frames.pop();
        }

        /// Snapshot of the current chain.
        pub fn chain(&self) -> Vec<String> {
            self.frames.clone()
        }

        /// The chain closed by `name`, used for cycle reports: `A -> B -> A`.
        pub fn cycle_through(&self, name: &str) -> Vec<String> {
            let start = self
                .frames
                .iter()
                .position(|frame| frame == name)
                .unwrap_or(0);
            let mut cycle = self.frames[start..].to_vec();
            cycle.push(name.to_string());
            cycle
        }

        pub fn depth(&self) -> usize {
            self.frames.len()
        }
    }

    /// Finds a cycle in a dependency graph.
    ///
    /// Edges pointing at nodes that are not keys of the graph are ignored.
    /// Returns the first cycle found, closed by repeating its first node.
    pub fn find_cycle(graph: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = Vec::new();

        let mut nodes: Vec<&String> = graph.keys().collect();
        nodes.sort();

        for node in nodes {
            if !visited.contains(node.as_str()) {
                if let Some(cycle) = detect_cycle_dfs(node, graph, &mut visited, &mut rec_stack) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn detect_cycle_dfs(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        rec_stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.push(node.to_string());

        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if let Some(start_idx) = rec_stack.iter().position(|x| x == dep) {
                    let mut cycle = rec_stack[start_idx..].to_vec();
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
                if !visited.contains(dep) && graph.contains_key(dep) {
                    if let Some(cycle) = detect_cycle_dfs(dep, graph, visited, rec_stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        rec_stack.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    mod naming_tests {
        use super::super::naming::*;

        #[test]
        fn test_normalize() {
            assert_eq!(normalize("\\\\App\\Users"), "App\\Users");
            assert_eq!(normalize(""), "");
        }
    }

    mod dependency_tests {
        use super::super::dependency::*;
        use std::collections::HashMap;

        #[test]
        fn test_resolution_stack() {
            let mut stack = ResolutionStack::new();

            assert!(stack.enter("A"));
            assert!(stack.enter("B"));
            assert!(!stack.enter("A"));
            assert_eq!(stack.chain(), vec!["A", "B"]);
            assert_eq!(stack.cycle_through("A"), vec!["A", "B", "A"]);

            stack.leave();
            assert_eq!(stack.depth(), 1);
            assert!(!stack.contains("B"));
        }

        #[test]
        fn test_find_cycle() {
            let mut deps = HashMap::new();
            deps.insert("A".to_string(), vec!["B".to_string()]);
            deps.insert("B".to_string(), vec!["C".to_string()]);
            deps.insert("C".to_string(), vec!["A".to_string()]);

            let cycle = find_cycle(&deps).expect("cycle");
            assert_eq!(cycle, vec!["A", "B", "C", "A"]);
        }

        #[test]
        fn test_find_cycle_self_dependency() {
            let mut deps = HashMap::new();
            deps.insert("A".to_string(), vec!["A".to_string()]);

            assert_eq!(find_cycle(&deps), Some(vec!["A".to_string(), "A".to_string()]));
        }

        #[test]
        fn test_acyclic_graph() {
            let mut deps = HashMap::new();
            deps.insert("config".to_string(), vec![]);
            deps.insert("database".to_string(), vec!["config".to_string()]);
            deps.insert(
                "users".to_string(),
                vec!["database".to_string(), "config".to_string(), "external".to_string()],
            );

            assert!(find_cycle(&deps).is_none());
        }
    }
}
