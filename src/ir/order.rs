//! Apply and teardown ordering.
//!
//! Nodes are layered with Kahn's algorithm: a wave holds every node whose
//! dependencies all sit in earlier waves, so the engine may work on a wave's
//! members concurrently. Within a wave nodes keep declaration order.

use super::graph::{IrGenError, ResourceGraph};

/// Logical ids that may be applied together.
pub type Wave = Vec<String>;

/// Waves in apply order.
///
/// # Errors
///
/// Returns [`IrGenError::MissingDependency`] when a node depends on an absent
/// id and [`IrGenError::CircularDependency`] when no further wave can be
/// formed.
///
/// # Examples
///
/// ```
/// use azstack::ir::{ResourceGraph, ResourceKind, ResourceNode, apply_waves};
///
/// let mut graph = ResourceGraph::new("demo", "dev");
/// graph.nodes.insert("rg".into(), ResourceNode::new("rg", ResourceKind::ResourceGroup));
/// let mut vnet = ResourceNode::new("vnet", ResourceKind::VirtualNetwork);
/// vnet.dependencies.push("rg".into());
/// graph.nodes.insert("vnet".into(), vnet);
/// let waves = apply_waves(&graph).expect("acyclic");
/// assert_eq!(waves, vec![vec!["rg".to_owned()], vec!["vnet".to_owned()]]);
/// ```
pub fn apply_waves(graph: &ResourceGraph) -> Result<Vec<Wave>, IrGenError> {
    let mut remaining: Vec<usize> = Vec::with_capacity(graph.nodes.len());
    for node in graph.nodes.values() {
        for dep in &node.dependencies {
            if !graph.nodes.contains_key(dep) {
                return Err(IrGenError::MissingDependency {
                    node: node.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        remaining.push(node.dependencies.len());
    }

    let mut placed = vec![false; graph.nodes.len()];
    let mut waves = Vec::new();
    let mut done = 0;
    while done < graph.nodes.len() {
        let ready: Vec<usize> = remaining
            .iter()
            .zip(&placed)
            .enumerate()
            .filter(|(_, (count, is_placed))| **count == 0 && !**is_placed)
            .map(|(idx, _)| idx)
            .collect();
        if ready.is_empty() {
            let cycle = super::cycle::analyse(&graph.nodes)
                .cycle
                .unwrap_or_else(|| pending_ids(graph, &placed));
            return Err(IrGenError::CircularDependency { cycle });
        }
        let mut wave = Vec::with_capacity(ready.len());
        for idx in ready {
            if let Some(flag) = placed.get_mut(idx) {
                *flag = true;
            }
            if let Some((id, _)) = graph.nodes.get_index(idx) {
                wave.push(id.clone());
            }
        }
        for (idx, node) in graph.nodes.values().enumerate() {
            let satisfied = node
                .dependencies
                .iter()
                .filter(|dep| wave.contains(*dep))
                .count();
            if let Some(count) = remaining.get_mut(idx) {
                *count = count.saturating_sub(satisfied);
            }
        }
        done += wave.len();
        waves.push(wave);
    }
    Ok(waves)
}

/// Waves in teardown order: dependents go before what they depend on.
///
/// # Errors
///
/// As for [`apply_waves`].
pub fn teardown_waves(graph: &ResourceGraph) -> Result<Vec<Wave>, IrGenError> {
    let mut waves = apply_waves(graph)?;
    waves.reverse();
    Ok(waves)
}

fn pending_ids(graph: &ResourceGraph, placed: &[bool]) -> Vec<String> {
    graph
        .nodes
        .keys()
        .zip(placed)
        .filter(|(_, is_placed)| !**is_placed)
        .map(|(id, _)| id.clone())
        .collect()
}
