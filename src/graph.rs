//! In-memory attributed street network graph.
//!
//! Nodes are intersections, directed edges are street segments. Two-way
//! streets appear as an edge pair sharing geometry through their way id;
//! the codec and cost model treat each edge independently. Attribute
//! values are typed per the registry in [`crate::attrs`].

use std::collections::HashMap;

use geo_types::Geometry;

use crate::attrs::{AttrValue, EdgeAttr, NodeAttr, NoiseSource};
use crate::noise::NoiseMap;

/// An intersection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub attrs: HashMap<NodeAttr, AttrValue>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, attr: NodeAttr) -> Option<&AttrValue> {
        self.attrs.get(&attr)
    }

    pub fn set(&mut self, attr: NodeAttr, value: AttrValue) {
        self.attrs.insert(attr, value);
    }

    pub fn id_ig(&self) -> Option<i64> {
        self.get(NodeAttr::IdIg)?.as_int()
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.get(NodeAttr::Geometry)?.as_geom()
    }

    pub fn geom_wgs(&self) -> Option<&Geometry<f64>> {
        self.get(NodeAttr::GeomWgs)?.as_geom()
    }

    pub fn traversable_walking(&self) -> Option<bool> {
        self.get(NodeAttr::TraversableWalking)?.as_bool()
    }

    pub fn traversable_biking(&self) -> Option<bool> {
        self.get(NodeAttr::TraversableBiking)?.as_bool()
    }

    pub fn traffic_light(&self) -> Option<bool> {
        self.get(NodeAttr::TrafficLight)?.as_bool()
    }
}

/// A directed street segment between two node indices of a [`Graph`].
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub attrs: HashMap<EdgeAttr, AttrValue>,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            attrs: HashMap::new(),
        }
    }

    pub fn get(&self, attr: EdgeAttr) -> Option<&AttrValue> {
        self.attrs.get(&attr)
    }

    pub fn set(&mut self, attr: EdgeAttr, value: AttrValue) {
        self.attrs.insert(attr, value);
    }

    pub fn id_ig(&self) -> Option<i64> {
        self.get(EdgeAttr::IdIg)?.as_int()
    }

    pub fn id_way(&self) -> Option<i64> {
        self.get(EdgeAttr::IdWay)?.as_int()
    }

    pub fn uv(&self) -> Option<(i64, i64)> {
        self.get(EdgeAttr::Uv)?.as_pair()
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.get(EdgeAttr::Geometry)?.as_geom()
    }

    pub fn length(&self) -> Option<f64> {
        self.get(EdgeAttr::Length)?.as_float()
    }

    pub fn bike_time_cost(&self) -> Option<f64> {
        self.get(EdgeAttr::BikeTimeCost)?.as_float()
    }

    pub fn bike_safety_cost(&self) -> Option<f64> {
        self.get(EdgeAttr::BikeSafetyCost)?.as_float()
    }

    /// Noise exposures with the tri-state intact: `None` when the edge has
    /// no noise data (attribute absent or null), `Some` of an empty map
    /// when it was measured and is quiet.
    pub fn noises(&self) -> Option<&NoiseMap> {
        self.get(EdgeAttr::Noises)?.as_noises()
    }

    /// Dominant noise source, when known and non-empty.
    pub fn noise_source(&self) -> Option<NoiseSource> {
        self.get(EdgeAttr::NoiseSource)?.as_str()?.parse().ok()
    }

    pub fn aqi(&self) -> Option<f64> {
        self.get(EdgeAttr::Aqi)?.as_float()
    }

    pub fn gvi(&self) -> Option<f64> {
        self.get(EdgeAttr::Gvi)?.as_float()
    }
}

/// The attributed directed multigraph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its index.
    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append an edge, returning its index. Endpoints must refer to
    /// existing nodes.
    pub fn add_edge(&mut self, edge: Edge) -> usize {
        debug_assert!(edge.source < self.nodes.len() && edge.target < self.nodes.len());
        self.edges.push(edge);
        self.edges.len() - 1
    }

    /// Extract the selected attributes of every node as records keyed by
    /// semantic attribute name. Attributes an element lacks are skipped.
    pub fn node_records(&self, attrs: &[NodeAttr]) -> Vec<HashMap<&'static str, AttrValue>> {
        self.nodes
            .iter()
            .map(|node| {
                attrs
                    .iter()
                    .filter_map(|&attr| Some((attr.name(), node.get(attr)?.clone())))
                    .collect()
            })
            .collect()
    }

    /// Extract the selected attributes of every edge as records keyed by
    /// semantic attribute name.
    pub fn edge_records(&self, attrs: &[EdgeAttr]) -> Vec<HashMap<&'static str, AttrValue>> {
        self.edges
            .iter()
            .map(|edge| {
                attrs
                    .iter()
                    .filter_map(|&attr| Some((attr.name(), edge.get(attr)?.clone())))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        let mut a = Node::new();
        a.set(NodeAttr::IdIg, AttrValue::Int(0));
        a.set(NodeAttr::TrafficLight, AttrValue::Bool(true));
        let mut b = Node::new();
        b.set(NodeAttr::IdIg, AttrValue::Int(1));
        let a = graph.add_node(a);
        let b = graph.add_node(b);

        let mut edge = Edge::new(a, b);
        edge.set(EdgeAttr::Length, AttrValue::Float(20.0));
        edge.set(EdgeAttr::Uv, AttrValue::Pair(0, 1));
        edge.set(
            EdgeAttr::Noises,
            AttrValue::Noises([(50, 10.0), (55, 10.0)].into_iter().collect()),
        );
        edge.set(EdgeAttr::NoiseSource, AttrValue::Str("road".to_string()));
        graph.add_edge(edge);
        graph
    }

    #[test]
    fn test_typed_accessors() {
        let graph = sample_graph();
        assert_eq!(graph.nodes[0].id_ig(), Some(0));
        assert_eq!(graph.nodes[0].traffic_light(), Some(true));
        assert_eq!(graph.nodes[1].traffic_light(), None);

        let edge = &graph.edges[0];
        assert_eq!(edge.length(), Some(20.0));
        assert_eq!(edge.uv(), Some((0, 1)));
        assert_eq!(edge.noise_source(), Some(NoiseSource::Road));
        assert_eq!(edge.noises().map(|n| n.len()), Some(2));
    }

    #[test]
    fn test_noises_tri_state() {
        let mut edge = Edge::new(0, 0);
        assert!(edge.noises().is_none());

        edge.set(EdgeAttr::Noises, AttrValue::Null);
        assert!(edge.noises().is_none());

        edge.set(EdgeAttr::Noises, AttrValue::Noises(NoiseMap::new()));
        assert_eq!(edge.noises().map(|n| n.len()), Some(0));
    }

    #[test]
    fn test_raw_value_not_typed() {
        let mut edge = Edge::new(0, 0);
        edge.set(EdgeAttr::Length, AttrValue::Raw("not-a-number".to_string()));
        assert_eq!(edge.length(), None);
        assert!(edge.get(EdgeAttr::Length).is_some());
    }

    #[test]
    fn test_edge_records() {
        let graph = sample_graph();
        let records = graph.edge_records(&[EdgeAttr::Length, EdgeAttr::Noises, EdgeAttr::Aqi]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["length"], AttrValue::Float(20.0));
        assert!(records[0].contains_key("noises"));
        // aqi not set on the edge: skipped
        assert!(!records[0].contains_key("aqi"));
    }

    #[test]
    fn test_node_records() {
        let graph = sample_graph();
        let records = graph.node_records(&[NodeAttr::IdIg, NodeAttr::TrafficLight]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id_ig"], AttrValue::Int(0));
        assert!(!records[1].contains_key("traffic_light"));
    }
}
