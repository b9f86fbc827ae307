//! Dependency graph analysis for plan tasks.

use std::collections::HashMap;

use crate::models::PlanTask;

/// Finds every dependency cycle among `tasks`.
///
/// Each cycle is a strongly connected component with more than one task,
/// listed in plan order. Self-dependencies and references to unknown tasks
/// are ignored here; the rules report those separately. When an id is
/// duplicated only its first occurrence contributes edges.
pub fn find_cycles(tasks: &[PlanTask]) -> Vec<Vec<String>> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (index, task) in tasks.iter().enumerate() {
        index_of.entry(task.id.as_str()).or_insert(index);
    }

    let edges: Vec<Vec<usize>> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            if index_of[task.id.as_str()] != index {
                return Vec::new();
            }
            task.dependencies
                .iter()
                .filter_map(|dep| index_of.get(dep.as_str()).copied())
                .filter(|&target| target != index)
                .collect()
        })
        .collect();

    let mut tarjan = Tarjan::new(edges.len());
    for node in 0..edges.len() {
        if tarjan.index[node].is_none() {
            tarjan.visit(node, &edges);
        }
    }

    let mut cycles: Vec<Vec<usize>> = tarjan
        .components
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .collect();
    cycles.sort();

    cycles
        .into_iter()
        .map(|component| {
            component
                .into_iter()
                .map(|index| tasks[index].id.clone())
                .collect()
        })
        .collect()
}

/// Returns true when the tasks form a DAG.
pub fn is_acyclic(tasks: &[PlanTask]) -> bool {
    find_cycles(tasks).is_empty()
}

struct Tarjan {
    next_index: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan {
    fn new(size: usize) -> Self {
        Self {
            next_index: 0,
            index: vec![None; size],
            lowlink: vec![0; size],
            on_stack: vec![false; size],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: usize, edges: &[Vec<usize>]) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        for &next in &edges[node] {
            match self.index[next] {
                None => {
                    self.visit(next, edges);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(next_index) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(next_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> PlanTask {
        PlanTask {
            id: id.to_string(),
            description: String::new(),
            phase: "p".to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            acceptance_criteria: None,
        }
    }

    #[test]
    fn test_two_task_cycle() {
        let tasks = vec![task("A", &["B"]), task("B", &["A"])];
        assert_eq!(find_cycles(&tasks), vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_acyclic_chain() {
        let tasks = vec![task("A", &[]), task("B", &["A"]), task("C", &["A", "B"])];
        assert!(is_acyclic(&tasks));
    }

    #[test]
    fn test_self_and_unknown_edges_ignored() {
        let tasks = vec![task("A", &["A", "Z"]), task("B", &["A"])];
        assert!(is_acyclic(&tasks));
    }

    #[test]
    fn test_separate_cycles_reported_in_plan_order() {
        let tasks = vec![
            task("A", &["C"]),
            task("B", &["A"]),
            task("C", &["B"]),
            task("D", &["E"]),
            task("E", &["D"]),
            task("F", &["A"]),
        ];
        let cycles = find_cycles(&tasks);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec!["A", "B", "C"]);
        assert_eq!(cycles[1], vec!["D", "E"]);
    }
}
