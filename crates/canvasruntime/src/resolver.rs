use canvascore::{GraphSnapshot, NodeId, NodeKind, WorkflowError};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

/// Dependency view over a graph snapshot.
///
/// Edges whose endpoints are not part of the snapshot are ignored.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    order: Vec<NodeId>,
    kinds: HashMap<NodeId, NodeKind>,
    position: HashMap<NodeId, usize>,
    /// target -> sources, in edge order
    incoming: HashMap<NodeId, Vec<NodeId>>,
    /// source -> targets, in node order
    outgoing: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyResolver {
    pub fn new(graph: &GraphSnapshot) -> Self {
        let order: Vec<NodeId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let position: HashMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let kinds = graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.kind))
            .collect();

        let mut incoming: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut outgoing: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &graph.edges {
            if !position.contains_key(&edge.source) || !position.contains_key(&edge.target) {
                tracing::warn!(
                    edge_id = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "ignoring dangling edge"
                );
                continue;
            }
            incoming
                .entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
            outgoing
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }
        for targets in outgoing.values_mut() {
            targets.sort_by_key(|id| position[id]);
            targets.dedup();
        }

        Self {
            order,
            kinds,
            position,
            incoming,
            outgoing,
        }
    }

    /// Node ids in graph order
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Sources feeding `id`, in edge order
    pub fn incoming_of(&self, id: &str) -> &[NodeId] {
        self.incoming.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Targets fed by `id`, in graph order
    pub fn outgoing_of(&self, id: &str) -> &[NodeId] {
        self.outgoing.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of distinct upstream nodes
    pub fn in_degree(&self, id: &str) -> usize {
        self.incoming_of(id).iter().collect::<HashSet<_>>().len()
    }

    /// Entry points: nodes without incoming edges, plus every `start` node.
    pub fn start_nodes(&self) -> Result<Vec<NodeId>, WorkflowError> {
        let starts: Vec<NodeId> = self
            .order
            .iter()
            .filter(|id| {
                self.incoming_of(id).is_empty() || self.kinds[*id] == NodeKind::Start
            })
            .cloned()
            .collect();

        if starts.is_empty() {
            return Err(WorkflowError::NoStartNodes);
        }
        Ok(starts)
    }

    /// Every node reachable downstream of `id`, excluding `id` itself
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for next in self.outgoing_of(current) {
                if next != id && seen.insert(next.as_str()) {
                    found.push(next.clone());
                    queue.push_back(next.as_str());
                }
            }
        }
        found
    }

    /// Members of one dependency cycle, in graph order, if any exists
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let indices: Vec<NodeIndex> = self
            .order
            .iter()
            .map(|id| graph.add_node(id.as_str()))
            .collect();
        for (source, targets) in &self.outgoing {
            for target in targets {
                graph.add_edge(
                    indices[self.position[source]],
                    indices[self.position[target]],
                    (),
                );
            }
        }

        tarjan_scc(&graph)
            .into_iter()
            .find(|component| {
                component.len() > 1
                    || graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut members: Vec<NodeId> = component
                    .into_iter()
                    .map(|idx| graph[idx].to_string())
                    .collect();
                members.sort_by_key(|id| self.position[id]);
                members
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvascore::{Edge, GraphStore, NodeSpec};

    fn store_with(kinds: &[(&str, NodeKind)], edges: &[(&str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        for (id, kind) in kinds {
            store.insert(NodeSpec::new(*kind).with_id(*id)).unwrap();
        }
        for (source, target) in edges {
            store.connect(source, target).unwrap();
        }
        store
    }

    #[test]
    fn incoming_and_outgoing_follow_edges() {
        let store = store_with(
            &[
                ("a", NodeKind::Start),
                ("b", NodeKind::Trigger),
                ("c", NodeKind::Test),
                ("d", NodeKind::Output),
            ],
            &[("b", "d"), ("a", "d"), ("a", "c"), ("a", "b")],
        );
        let resolver = DependencyResolver::new(&store.snapshot());

        assert_eq!(resolver.incoming_of("d"), ["b", "a"]);
        assert_eq!(resolver.outgoing_of("a"), ["b", "c", "d"]);
        assert_eq!(resolver.in_degree("d"), 2);
        assert!(resolver.incoming_of("a").is_empty());
    }

    #[test]
    fn start_nodes_include_unconnected_and_start_typed() {
        let store = store_with(
            &[
                ("loop", NodeKind::Start),
                ("a", NodeKind::Agent),
                ("free", NodeKind::Test),
            ],
            &[("a", "loop"), ("loop", "a")],
        );
        let resolver = DependencyResolver::new(&store.snapshot());

        assert_eq!(resolver.start_nodes().unwrap(), ["loop", "free"]);
    }

    #[test]
    fn no_start_nodes_is_an_error() {
        let store = store_with(
            &[("a", NodeKind::Output), ("b", NodeKind::Output)],
            &[("a", "b"), ("b", "a")],
        );
        let resolver = DependencyResolver::new(&store.snapshot());

        let err = resolver.start_nodes().unwrap_err();
        assert!(matches!(err, WorkflowError::NoStartNodes));
        assert!(err.to_string().contains("No start nodes found"));
    }

    #[test]
    fn empty_graph_has_no_start_nodes() {
        let resolver = DependencyResolver::new(&GraphSnapshot::default());
        assert!(resolver.start_nodes().is_err());
    }

    #[test]
    fn descendants_cover_every_downstream_path() {
        let store = store_with(
            &[
                ("s", NodeKind::Start),
                ("a", NodeKind::Agent),
                ("b", NodeKind::Pool),
                ("c", NodeKind::Output),
                ("x", NodeKind::Test),
            ],
            &[("s", "a"), ("a", "b"), ("a", "c"), ("b", "c"), ("s", "x")],
        );
        let resolver = DependencyResolver::new(&store.snapshot());

        assert_eq!(resolver.descendants("a"), ["b", "c"]);
        assert!(resolver.descendants("c").is_empty());
    }

    #[test]
    fn cycles_are_detected() {
        let acyclic = store_with(
            &[("s", NodeKind::Start), ("t", NodeKind::Output)],
            &[("s", "t")],
        );
        assert!(DependencyResolver::new(&acyclic.snapshot())
            .find_cycle()
            .is_none());

        let cyclic = store_with(
            &[
                ("s", NodeKind::Start),
                ("a", NodeKind::Agent),
                ("b", NodeKind::Pool),
            ],
            &[("s", "a"), ("a", "b"), ("b", "a")],
        );
        assert_eq!(
            DependencyResolver::new(&cyclic.snapshot()).find_cycle(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn dangling_edges_are_inert() {
        let mut snapshot = store_with(&[("s", NodeKind::Start)], &[]).snapshot();
        snapshot.edges.push(Edge {
            id: "e".into(),
            source: "ghost".into(),
            target: "s".into(),
        });

        let resolver = DependencyResolver::new(&snapshot);
        assert!(resolver.incoming_of("s").is_empty());
        assert_eq!(resolver.start_nodes().unwrap(), ["s"]);
    }
}
