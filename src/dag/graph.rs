use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use crate::config::types::Table;

/// Dependency graph over table names. An edge `A -> B` means A carries a
/// foreign key referencing B, so B must exist before A is created.
pub type TableGraph = DiGraph<String, ()>;

/// Build the graph for a set of tables. Foreign keys pointing at tables
/// outside the set contribute no edge and are not an error; duplicate edges
/// between the same pair collapse into one. When the same table name appears
/// twice (a desired and a recorded descriptor), the node is shared and both
/// descriptors' edges are unioned.
pub fn build_table_graph<'a, I>(tables: I) -> TableGraph
where
    I: IntoIterator<Item = &'a Table>,
{
    let tables: Vec<&Table> = tables.into_iter().collect();

    let mut graph = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for table in &tables {
        if !nodes.contains_key(&table.name) {
            let idx = graph.add_node(table.name.clone());
            nodes.insert(table.name.clone(), idx);
        }
    }

    for table in &tables {
        let from = nodes[&table.name];
        for fk in &table.foreign_keys {
            if let Some(&to) = nodes.get(&fk.reference_table) {
                graph.update_edge(from, to, ());
            }
        }
    }

    graph
}

/// Topological order with dependencies before dependents (referenced tables
/// first), produced by a DFS post-order walk.
///
/// A back-edge means a dependency cycle; it is logged naming the table and
/// the walk proceeds, so every node still appears exactly once in the output
/// and planning never aborts on cyclic configs.
pub fn creation_order(graph: &TableGraph) -> Vec<String> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut on_stack: HashSet<NodeIndex> = HashSet::new();
    let mut order: Vec<NodeIndex> = Vec::new();

    for node in graph.node_indices() {
        visit(graph, node, &mut visited, &mut on_stack, &mut order);
    }

    order.into_iter().map(|idx| graph[idx].clone()).collect()
}

fn visit(
    graph: &TableGraph,
    node: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    on_stack: &mut HashSet<NodeIndex>,
    order: &mut Vec<NodeIndex>,
) {
    if visited.contains(&node) {
        return;
    }
    if on_stack.contains(&node) {
        tracing::warn!(
            table = %graph[node],
            "Dependency cycle detected involving this table; continuing in visit order"
        );
        return;
    }

    on_stack.insert(node);
    for neighbor in graph.neighbors(node) {
        visit(graph, neighbor, visited, on_stack, order);
    }
    on_stack.remove(&node);

    visited.insert(node);
    order.push(node);
}

/// Order for drops: dependents before dependencies.
pub fn deletion_order(graph: &TableGraph) -> Vec<String> {
    let mut order = creation_order(graph);
    order.reverse();
    order
}
