//! Cycle detection utilities for the resource graph.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::ResourceNode;

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

pub(crate) struct CycleDetectionReport {
    pub(crate) cycle: Option<Vec<String>>,
    pub(crate) missing_dependencies: Vec<(String, String)>,
}

pub(crate) fn analyse(nodes: &IndexMap<String, ResourceNode>) -> CycleDetectionReport {
    let mut detector = CycleDetector::new(nodes);
    let mut cycle = None;
    for id in nodes.keys() {
        if detector.is_visited(id) {
            continue;
        }
        if let Some(found) = detector.visit(id) {
            cycle = Some(found);
            break;
        }
    }
    CycleDetectionReport {
        cycle,
        missing_dependencies: detector.missing_dependencies,
    }
}

struct CycleDetector<'a> {
    nodes: &'a IndexMap<String, ResourceNode>,
    stack: Vec<&'a str>,
    states: HashMap<&'a str, VisitState>,
    missing_dependencies: Vec<(String, String)>,
}

impl<'a> CycleDetector<'a> {
    fn new(nodes: &'a IndexMap<String, ResourceNode>) -> Self {
        Self {
            nodes,
            stack: Vec::new(),
            states: HashMap::new(),
            missing_dependencies: Vec::new(),
        }
    }

    fn is_visited(&self, id: &str) -> bool {
        matches!(self.states.get(id), Some(VisitState::Visited))
    }

    fn visit(&mut self, id: &'a str) -> Option<Vec<String>> {
        match self.states.get(id) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| *n == id)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting node must be on the stack");
                        0
                    });
                let mut cycle: Vec<String> = self
                    .stack
                    .iter()
                    .skip(idx)
                    .map(|n| (*n).to_owned())
                    .collect();
                cycle.push(id.to_owned());
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(id, VisitState::Visiting);
            }
        }

        self.stack.push(id);

        let nodes = self.nodes;
        if let Some(node) = nodes.get(id) {
            for dep in &node.dependencies {
                if !nodes.contains_key(dep) {
                    tracing::debug!(
                        missing = %dep,
                        dependent = %id,
                        "skipping dependency missing from graph during cycle detection",
                    );
                    self.missing_dependencies.push((id.to_owned(), dep.clone()));
                    continue;
                }

                if let Some(cycle) = self.visit(dep.as_str()) {
                    return Some(cycle);
                }
            }
        }

        self.stack.pop();
        self.states.insert(id, VisitState::Visited);
        None
    }
}

fn canonicalize_cycle(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ResourceKind;

    fn nodes(edges: &[(&str, &[&str])]) -> IndexMap<String, ResourceNode> {
        edges
            .iter()
            .map(|(id, deps)| {
                let mut node = ResourceNode::new(*id, ResourceKind::Subnet);
                node.dependencies = deps.iter().map(|d| (*d).to_owned()).collect();
                ((*id).to_owned(), node)
            })
            .collect()
    }

    #[test]
    fn cycle_detector_detects_self_edge_cycle() {
        let graph = nodes(&[("a", &["a"])]);
        let cycle = analyse(&graph).cycle.expect("cycle");
        assert_eq!(cycle, ["a", "a"]);
    }

    #[test]
    fn cycle_detector_marks_nodes_visited_after_traversal() {
        let graph = nodes(&[("a", &["b"]), ("b", &[])]);
        let mut detector = CycleDetector::new(&graph);
        assert!(detector.visit("a").is_none());
        assert!(detector.is_visited("a"));
        assert!(detector.is_visited("b"));
        assert!(
            detector.stack.is_empty(),
            "stack should be empty after complete traversal",
        );
    }

    #[test]
    fn cycle_detector_records_missing_dependencies() {
        let graph = nodes(&[("a", &["b"])]);
        let report = analyse(&graph);
        assert!(report.cycle.is_none());
        assert_eq!(
            report.missing_dependencies,
            [("a".to_owned(), "b".to_owned())]
        );
    }

    #[test]
    fn find_cycle_identifies_cycle() {
        let graph = nodes(&[("a", &["b"]), ("b", &["a"])]);
        let cycle = analyse(&graph).cycle.expect("cycle");
        assert_eq!(cycle, ["a", "b", "a"]);
    }

    #[test]
    fn canonicalize_cycle_rotates_smallest_node() {
        let cycle = ["c", "a", "b", "c"].map(String::from).to_vec();
        assert_eq!(canonicalize_cycle(cycle), ["a", "b", "c", "a"]);
    }

    #[test]
    fn canonicalize_cycle_handles_reverse_direction() {
        let cycle = ["c", "b", "a", "c"].map(String::from).to_vec();
        assert_eq!(canonicalize_cycle(cycle), ["a", "c", "b", "a"]);
    }
}
