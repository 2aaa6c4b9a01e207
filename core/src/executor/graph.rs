use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CoordinationError;
use crate::plan::{DependencyEdge, Step};

/// Step dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct StepGraph {
    /// Step nodes: step_id -> Step
    pub nodes: HashMap<String, Step>,

    /// Dependency edges: step_id -> list of prerequisites
    pub edges: HashMap<String, Vec<String>>,

    /// Reverse edges: step_id -> list of steps that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,

    /// Original declaration order (tie-break among ready steps)
    insertion_order: Vec<String>,
}

impl StepGraph {
    /// Build the graph from steps plus explicit dependency edges.
    ///
    /// A step's prerequisites are its own list followed by every edge that
    /// targets it, deduplicated.
    pub fn build(steps: &[Step], dependencies: &[DependencyEdge]) -> Result<Self, CoordinationError> {
        let mut nodes = HashMap::new();
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for step in steps {
            if nodes.contains_key(&step.id) {
                return Err(CoordinationError::DuplicateTaskId(step.id.clone()));
            }
            nodes.insert(step.id.clone(), step.clone());
            edges.insert(step.id.clone(), Vec::new());
            insertion_order.push(step.id.clone());
        }

        let declared = steps
            .iter()
            .flat_map(|s| s.dependencies.iter().map(move |d| (d, &s.id)));
        let explicit = dependencies
            .iter()
            .map(|e| (&e.prerequisite_id, &e.dependent_id));

        for (prerequisite, dependent) in declared.chain(explicit) {
            let Some(prereqs) = edges.get_mut(dependent) else {
                return Err(CoordinationError::DependencyNotFound {
                    task_id: dependent.clone(),
                    missing_dep: prerequisite.clone(),
                });
            };
            if prereqs.contains(prerequisite) {
                continue;
            }
            prereqs.push(prerequisite.clone());
            reverse_edges
                .entry(prerequisite.clone())
                .or_default()
                .push(dependent.clone());
        }

        Ok(Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
        })
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), CoordinationError> {
        for task_id in &self.insertion_order {
            for dep in self.prerequisites(task_id) {
                if !self.nodes.contains_key(dep) {
                    return Err(CoordinationError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(CoordinationError::CircularDependency(cycle));
        }

        Ok(())
    }

    pub fn prerequisites(&self, step_id: &str) -> &[String] {
        self.edges.get(step_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Topological order using Kahn's algorithm
    ///
    /// The queue is seeded with every step of in-degree 0 in declaration
    /// order, and dependents are enqueued as soon as their last prerequisite
    /// is dequeued, so among ready steps the earlier-declared one runs first.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of steps, E = number of dependencies
    pub fn execution_order(&self) -> Result<Vec<String>, CoordinationError> {
        let mut in_degree: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .map(|id| (id.as_str(), self.prerequisites(id).len()))
            .collect();

        let mut queue: VecDeque<&str> = self
            .insertion_order
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id).copied() == Some(0))
            .collect();

        let mut order = Vec::with_capacity(self.insertion_order.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());

            for dependent in self.reverse_edges.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        // Anything left unemitted sits on a cycle
        if order.len() != self.insertion_order.len() {
            let cycle = self
                .detect_cycle()
                .unwrap_or_else(|| "Unable to complete topological sort (cycle detected)".into());
            return Err(CoordinationError::CircularDependency(cycle));
        }

        Ok(order)
    }

    /// Detect circular dependencies using DFS, in declaration order so the
    /// reported path is stable.
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(stack.join(" -> "));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        for dep in self.prerequisites(node) {
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(dep.clone());
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

/// Reorder `steps` so every step follows all of its prerequisites.
///
/// Fails with a configuration error on unknown prerequisites or cycles; this
/// happens before any step is scheduled.
pub fn resolve_execution_order(
    steps: &[Step],
    dependencies: &[DependencyEdge],
) -> Result<Vec<Step>, CoordinationError> {
    let graph = StepGraph::build(steps, dependencies)?;
    graph.validate()?;
    let order = graph.execution_order()?;
    Ok(order
        .iter()
        .filter_map(|id| graph.nodes.get(id).cloned())
        .collect())
}
