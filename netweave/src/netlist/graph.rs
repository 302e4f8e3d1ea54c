//! Connectivity Graph
//!
//! Read-only bipartite view of a design using petgraph: one node per part,
//! one node per net, one edge per bound pin. Used for connectivity queries
//! that cut across nets, such as finding groups of parts that are joined
//! through any chain of nets.

use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use std::collections::HashSet;

use super::design::Design;

/// Node type in the connectivity graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    /// A part, by reference
    Part(String),
    /// A net, by name
    Net(String),
}

impl GraphNode {
    pub fn is_part(&self) -> bool {
        matches!(self, GraphNode::Part(_))
    }

    pub fn as_part(&self) -> Option<&str> {
        match self {
            GraphNode::Part(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_net(&self) -> Option<&str> {
        match self {
            GraphNode::Net(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    /// Edge weight is the pin designator on the part side
    graph: UnGraph<GraphNode, String>,

    /// Index mapping: reference -> node index, in instantiation order
    part_indices: IndexMap<String, NodeIndex>,

    /// Index mapping: net name -> node index, in net declaration order
    net_indices: IndexMap<String, NodeIndex>,
}

impl ConnectivityGraph {
    pub fn from_design(design: &Design) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut part_indices = IndexMap::new();
        let mut net_indices = IndexMap::new();

        for part in design.instances() {
            let idx = graph.add_node(GraphNode::Part(part.reference().to_string()));
            part_indices.insert(part.reference().to_string(), idx);
        }

        for net in design.nets() {
            let net_idx = graph.add_node(GraphNode::Net(net.name().to_string()));
            net_indices.insert(net.name().to_string(), net_idx);
            for pin in net.pins() {
                if let Some(&part_idx) = part_indices.get(&pin.reference) {
                    graph.add_edge(part_idx, net_idx, pin.designator.clone());
                }
            }
        }

        Self {
            graph,
            part_indices,
            net_indices,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of bound pins.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Parts with at least one pin on `net_name`, in instantiation order.
    pub fn parts_on_net(&self, net_name: &str) -> Vec<&str> {
        let Some(&net_idx) = self.net_indices.get(net_name) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .graph
            .edges(net_idx)
            .filter_map(|edge| {
                let other = if edge.source() == net_idx { edge.target() } else { edge.source() };
                self.graph[other]
                    .as_part()
                    .and_then(|r| self.part_indices.get_index_of(r))
            })
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .filter_map(|i| self.part_indices.get_index(i).map(|(r, _)| r.as_str()))
            .collect()
    }

    /// Nets touched by `reference`, in net declaration order.
    pub fn nets_for_part(&self, reference: &str) -> Vec<&str> {
        let Some(&part_idx) = self.part_indices.get(reference) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .graph
            .edges(part_idx)
            .filter_map(|edge| {
                let other = if edge.source() == part_idx { edge.target() } else { edge.source() };
                self.graph[other]
                    .as_net()
                    .and_then(|n| self.net_indices.get_index_of(n))
            })
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .filter_map(|i| self.net_indices.get_index(i).map(|(n, _)| n.as_str()))
            .collect()
    }

    /// Groups of parts joined through nets.
    ///
    /// Each group lists references in instantiation order; groups are ordered
    /// by their first member. A part with no bound pins is its own group.
    pub fn islands(&self) -> Vec<Vec<String>> {
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut islands = Vec::new();

        for (_, &start) in &self.part_indices {
            if seen.contains(&start) {
                continue;
            }
            let mut members = Vec::new();
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                seen.insert(node);
                if let Some(reference) = self.graph[node].as_part() {
                    if let Some(pos) = self.part_indices.get_index_of(reference) {
                        members.push(pos);
                    }
                }
            }
            members.sort_unstable();
            islands.push(
                members
                    .into_iter()
                    .filter_map(|i| self.part_indices.get_index(i).map(|(r, _)| r.clone()))
                    .collect(),
            );
        }

        islands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::PinRef;
    use crate::registry::{PinFunction, PinSpec};

    fn chain_design() -> Design {
        let mut design = Design::new();
        let r = design
            .define_template(
                "R",
                "R_0402",
                vec![
                    PinSpec::new("1", "~", PinFunction::Passive),
                    PinSpec::new("2", "~", PinFunction::Passive),
                ],
            )
            .unwrap();
        for reference in ["R1", "R2", "R3", "R4"] {
            design.instantiate(r, reference, None).unwrap();
        }
        design.bind("A", "R1", "2").unwrap();
        design.bind("A", "R2", "1").unwrap();
        design.bind("B", "R2", "2").unwrap();
        design.bind("B", "R3", "1").unwrap();
        design
            .connect(&PinRef::new("R3", "2"), &PinRef::new("R2", "2"))
            .unwrap();
        design
    }

    #[test]
    fn test_graph_shape() {
        let graph = ConnectivityGraph::from_design(&chain_design());
        assert_eq!(graph.node_count(), 4 + 2);
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn test_parts_on_net() {
        let graph = ConnectivityGraph::from_design(&chain_design());
        assert_eq!(graph.parts_on_net("B"), vec!["R2", "R3"]);
        assert!(graph.parts_on_net("missing").is_empty());
    }

    #[test]
    fn test_nets_for_part() {
        let graph = ConnectivityGraph::from_design(&chain_design());
        assert_eq!(graph.nets_for_part("R2"), vec!["A", "B"]);
        assert!(graph.nets_for_part("R4").is_empty());
    }

    #[test]
    fn test_islands() {
        let graph = ConnectivityGraph::from_design(&chain_design());
        let islands = graph.islands();
        assert_eq!(
            islands,
            vec![
                vec!["R1".to_string(), "R2".to_string(), "R3".to_string()],
                vec!["R4".to_string()],
            ]
        );
    }
}
