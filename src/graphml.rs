//! GraphML codec for the attributed street network graph.
//!
//! The exchange format is GraphML text: one element set for nodes, one for
//! edges, every attribute value stored as text under its compact wire key.
//! Import resolves wire keys through the attribute registry and decodes
//! whole columns to typed values; export encodes a working copy back to
//! wire strings. Degradation is deliberate and column-wise: unknown wire
//! keys and malformed columns are logged and skipped, never fatal, while a
//! structurally broken file is.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use log::{info, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::attrs::{AttrValue, EdgeAttr, NodeAttr, ValueKind};
use crate::error::{xml_err, Error, Result};
use crate::graph::{Edge, Graph, Node};

/// Import a graph from a GraphML file, decoding every node and edge
/// attribute that is recognized by the registry.
pub fn import_graphml<P: AsRef<Path>>(path: P) -> Result<Graph> {
    let raw = parse_raw(path.as_ref())?;

    let node_index: HashMap<&str, usize> = raw
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.xml_id.as_str(), index))
        .collect();

    let mut endpoints = Vec::with_capacity(raw.edges.len());
    for edge in &raw.edges {
        let resolve = |id: &str| {
            node_index
                .get(id)
                .copied()
                .ok_or_else(|| Error::Graph(format!("edge references unknown node '{}'", id)))
        };
        endpoints.push((resolve(&edge.source)?, resolve(&edge.target)?));
    }

    // the node id column is structural, not a registry attribute
    let mut node_attrs: Vec<HashMap<String, String>> =
        raw.nodes.into_iter().map(|node| node.attrs).collect();
    for attrs in &mut node_attrs {
        attrs.remove("id");
    }
    let edge_attrs: Vec<HashMap<String, String>> =
        raw.edges.into_iter().map(|edge| edge.attrs).collect();

    let node_columns = convert_columns("node", &node_attrs, |key| {
        NodeAttr::from_wire_key(key).map(|attr| (attr, attr.kind()))
    });
    let edge_columns = convert_columns("edge", &edge_attrs, |key| {
        EdgeAttr::from_wire_key(key).map(|attr| (attr, attr.kind()))
    });

    let mut graph = Graph::new();
    for attrs in node_columns {
        graph.add_node(Node { attrs });
    }
    for ((source, target), attrs) in endpoints.into_iter().zip(edge_columns) {
        graph.add_edge(Edge {
            source,
            target,
            attrs,
        });
    }
    Ok(graph)
}

/// Export a graph to a GraphML file.
///
/// With no explicit attribute subset for a kind, every registry attribute
/// present on the data is written. With a subset, exactly those attributes
/// are written and everything else is stripped from the working copy; the
/// caller's graph is never touched.
pub fn export_graphml<P: AsRef<Path>>(
    graph: &Graph,
    path: P,
    node_attrs: Option<&[NodeAttr]>,
    edge_attrs: Option<&[EdgeAttr]>,
) -> Result<()> {
    let mut work = graph.clone();

    let node_set = selected_node_attrs(&work, node_attrs)?;
    let edge_set = selected_edge_attrs(&work, edge_attrs)?;

    if node_attrs.is_some() {
        for node in &mut work.nodes {
            node.attrs.retain(|attr, _| node_set.contains(attr));
        }
    }
    if edge_attrs.is_some() {
        for edge in &mut work.edges {
            edge.attrs.retain(|attr, _| edge_set.contains(attr));
        }
    }

    write_graphml(&work, path.as_ref(), &node_set, &edge_set)?;
    info!("Exported graph to file: {}", path.as_ref().display());
    Ok(())
}

fn selected_node_attrs(graph: &Graph, requested: Option<&[NodeAttr]>) -> Result<Vec<NodeAttr>> {
    match requested {
        Some(attrs) => {
            for &attr in attrs {
                if !graph.nodes.iter().all(|node| node.attrs.contains_key(&attr)) {
                    return Err(Error::Graph(format!(
                        "node attribute '{}' is not present on all nodes",
                        attr.name()
                    )));
                }
            }
            Ok(attrs.to_vec())
        }
        None => match graph.nodes.first() {
            Some(first) => Ok(NodeAttr::ALL
                .iter()
                .copied()
                .filter(|attr| first.attrs.contains_key(attr))
                .collect()),
            None => Ok(Vec::new()),
        },
    }
}

fn selected_edge_attrs(graph: &Graph, requested: Option<&[EdgeAttr]>) -> Result<Vec<EdgeAttr>> {
    match requested {
        Some(attrs) => {
            for &attr in attrs {
                if !graph.edges.iter().all(|edge| edge.attrs.contains_key(&attr)) {
                    return Err(Error::Graph(format!(
                        "edge attribute '{}' is not present on all edges",
                        attr.name()
                    )));
                }
            }
            Ok(attrs.to_vec())
        }
        None => match graph.edges.first() {
            Some(first) => Ok(EdgeAttr::ALL
                .iter()
                .copied()
                .filter(|attr| first.attrs.contains_key(attr))
                .collect()),
            None => Ok(Vec::new()),
        },
    }
}

// ---------------------------------------------------------------------------
// Raw parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RawNode {
    xml_id: String,
    attrs: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct RawEdge {
    source: String,
    target: String,
    attrs: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct RawGraph {
    nodes: Vec<RawNode>,
    edges: Vec<RawEdge>,
}

#[derive(Clone, Copy, PartialEq)]
enum Scope {
    Top,
    Node,
    Edge,
}

/// Read the GraphML structure with all attribute values as raw strings.
fn parse_raw(path: &Path) -> Result<RawGraph> {
    let mut reader = Reader::from_file(path).map_err(xml_err)?;
    let mut buf = Vec::new();

    // key id -> attribute name, from <key> declarations; undeclared data
    // keys fall back to the key id itself
    let mut key_names: HashMap<String, String> = HashMap::new();

    let mut raw = RawGraph::default();
    let mut scope = Scope::Top;
    let mut node = RawNode::default();
    let mut edge = RawEdge::default();
    let mut data_name: Option<String> = None;
    let mut data_text = String::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(ref tag) | Event::Empty(ref tag) if tag.name().as_ref() == b"key" => {
                let id = require_attr(tag, b"id", "key")?;
                let name = get_attr(tag, b"attr.name")?.unwrap_or_else(|| id.clone());
                key_names.insert(id, name);
            }
            Event::Start(ref tag) if tag.name().as_ref() == b"node" => {
                node = RawNode {
                    xml_id: require_attr(tag, b"id", "node")?,
                    attrs: HashMap::new(),
                };
                scope = Scope::Node;
            }
            Event::Empty(ref tag) if tag.name().as_ref() == b"node" => {
                raw.nodes.push(RawNode {
                    xml_id: require_attr(tag, b"id", "node")?,
                    attrs: HashMap::new(),
                });
            }
            Event::Start(ref tag) if tag.name().as_ref() == b"edge" => {
                edge = RawEdge {
                    source: require_attr(tag, b"source", "edge")?,
                    target: require_attr(tag, b"target", "edge")?,
                    attrs: HashMap::new(),
                };
                scope = Scope::Edge;
            }
            Event::Empty(ref tag) if tag.name().as_ref() == b"edge" => {
                raw.edges.push(RawEdge {
                    source: require_attr(tag, b"source", "edge")?,
                    target: require_attr(tag, b"target", "edge")?,
                    attrs: HashMap::new(),
                });
            }
            Event::Start(ref tag) if tag.name().as_ref() == b"data" && scope != Scope::Top => {
                let key = require_attr(tag, b"key", "data")?;
                data_name = Some(key_names.get(&key).cloned().unwrap_or(key));
                data_text.clear();
            }
            Event::Empty(ref tag) if tag.name().as_ref() == b"data" && scope != Scope::Top => {
                let key = require_attr(tag, b"key", "data")?;
                let name = key_names.get(&key).cloned().unwrap_or(key);
                match scope {
                    Scope::Node => node.attrs.insert(name, String::new()),
                    Scope::Edge => edge.attrs.insert(name, String::new()),
                    Scope::Top => unreachable!(),
                };
            }
            Event::Text(text) => {
                if data_name.is_some() {
                    data_text.push_str(&text.unescape().map_err(xml_err)?);
                }
            }
            Event::End(ref tag) => match tag.name().as_ref() {
                b"data" => {
                    if let Some(name) = data_name.take() {
                        let value = std::mem::take(&mut data_text);
                        match scope {
                            Scope::Node => node.attrs.insert(name, value),
                            Scope::Edge => edge.attrs.insert(name, value),
                            Scope::Top => None,
                        };
                    }
                }
                b"node" => {
                    raw.nodes.push(std::mem::take(&mut node));
                    scope = Scope::Top;
                }
                b"edge" => {
                    raw.edges.push(std::mem::take(&mut edge));
                    scope = Scope::Top;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(raw)
}

fn get_attr(tag: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn require_attr(tag: &BytesStart, name: &[u8], element: &str) -> Result<String> {
    get_attr(tag, name)?.ok_or_else(|| {
        Error::Graph(format!(
            "<{}> element without '{}' attribute",
            element,
            String::from_utf8_lossy(name)
        ))
    })
}

// ---------------------------------------------------------------------------
// Typed conversion
// ---------------------------------------------------------------------------

/// Convert raw string columns to typed attribute maps.
///
/// The attribute schema is probed from the first element and then validated
/// across the whole collection: a key missing from any element is schema
/// drift and drops the column. Unrecognized wire keys drop their column
/// with a warning. A column whose decode fails anywhere is kept as raw
/// wire text instead of typed values. An empty collection has no schema.
fn convert_columns<A>(
    kind_name: &str,
    raws: &[HashMap<String, String>],
    resolve: impl Fn(&str) -> Option<(A, ValueKind)>,
) -> Vec<HashMap<A, AttrValue>>
where
    A: Copy + Eq + Hash,
{
    let mut out: Vec<HashMap<A, AttrValue>> = vec![HashMap::new(); raws.len()];
    let Some(first) = raws.first() else {
        return out;
    };

    let mut schema: Vec<&str> = first.keys().map(String::as_str).collect();
    schema.sort_unstable();

    // keys that appear only on later elements are schema drift as well
    let mut extra: BTreeSet<&str> = BTreeSet::new();
    for raw in &raws[1..] {
        for key in raw.keys() {
            if !first.contains_key(key) {
                extra.insert(key);
            }
        }
    }
    for key in extra {
        warn!(
            "Dropping {} attribute '{}': not present on all elements (schema drift)",
            kind_name, key
        );
    }

    for key in schema {
        if !raws.iter().all(|raw| raw.contains_key(key)) {
            warn!(
                "Dropping {} attribute '{}': not present on all elements (schema drift)",
                kind_name, key
            );
            continue;
        }
        let Some((attr, kind)) = resolve(key) else {
            warn!("Skipping unrecognized {} attribute '{}'", kind_name, key);
            continue;
        };

        let mut column = Vec::with_capacity(raws.len());
        for raw in raws {
            match AttrValue::decode(kind, &raw[key]) {
                Ok(value) => column.push(value),
                Err(err) => {
                    warn!("Failed to read {} attribute '{}': {}", kind_name, key, err);
                    column = raws.iter().map(|raw| AttrValue::Raw(raw[key].clone())).collect();
                    break;
                }
            }
        }
        for (attrs, value) in out.iter_mut().zip(column) {
            attrs.insert(attr, value);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";

fn write_graphml(
    graph: &Graph,
    path: &Path,
    node_attrs: &[NodeAttr],
    edge_attrs: &[EdgeAttr],
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = Writer::new_with_indent(BufWriter::new(file), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut graphml = BytesStart::new("graphml");
    graphml.push_attribute(("xmlns", GRAPHML_NS));
    graphml.push_attribute(("xmlns:xsi", XSI_NS));
    graphml.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(graphml)).map_err(xml_err)?;

    for attr in node_attrs {
        write_key_decl(&mut writer, "node", "v_", attr.wire_key())?;
    }
    for attr in edge_attrs {
        write_key_decl(&mut writer, "edge", "e_", attr.wire_key())?;
    }

    let mut graph_tag = BytesStart::new("graph");
    graph_tag.push_attribute(("id", "G"));
    graph_tag.push_attribute(("edgedefault", "directed"));
    writer.write_event(Event::Start(graph_tag)).map_err(xml_err)?;

    for (index, node) in graph.nodes.iter().enumerate() {
        let id = format!("n{}", index);
        let mut tag = BytesStart::new("node");
        tag.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(tag)).map_err(xml_err)?;
        for attr in node_attrs {
            if let Some(value) = node.get(*attr) {
                write_data(&mut writer, "v_", attr.wire_key(), &value.encode())?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new("node")))
            .map_err(xml_err)?;
    }

    for edge in &graph.edges {
        let source = format!("n{}", edge.source);
        let target = format!("n{}", edge.target);
        let mut tag = BytesStart::new("edge");
        tag.push_attribute(("source", source.as_str()));
        tag.push_attribute(("target", target.as_str()));
        writer.write_event(Event::Start(tag)).map_err(xml_err)?;
        for attr in edge_attrs {
            if let Some(value) = edge.get(*attr) {
                write_data(&mut writer, "e_", attr.wire_key(), &value.encode())?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new("edge")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("graph")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("graphml")))
        .map_err(xml_err)?;

    writer.into_inner().flush()?;
    Ok(())
}

fn write_key_decl<W: std::io::Write>(
    writer: &mut Writer<W>,
    domain: &str,
    id_prefix: &str,
    wire_key: &str,
) -> Result<()> {
    let id = format!("{}{}", id_prefix, wire_key);
    let mut tag = BytesStart::new("key");
    tag.push_attribute(("id", id.as_str()));
    tag.push_attribute(("for", domain));
    tag.push_attribute(("attr.name", wire_key));
    tag.push_attribute(("attr.type", "string"));
    writer.write_event(Event::Empty(tag)).map_err(xml_err)
}

fn write_data<W: std::io::Write>(
    writer: &mut Writer<W>,
    id_prefix: &str,
    wire_key: &str,
    value: &str,
) -> Result<()> {
    let key = format!("{}{}", id_prefix, wire_key);
    let mut tag = BytesStart::new("data");
    tag.push_attribute(("key", key.as_str()));
    writer.write_event(Event::Start(tag)).map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("data")))
        .map_err(xml_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#;

    #[test]
    fn test_import_minimal() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <key id="v_ii" for="node" attr.name="ii" attr.type="string"/>
  <key id="e_l" for="edge" attr.name="l" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <node id="n0"><data key="v_ii">0</data></node>
    <node id="n1"><data key="v_ii">1</data></node>
    <edge source="n0" target="n1"><data key="e_l">12.5</data></edge>
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.nodes[0].id_ig(), Some(0));
        assert_eq!(graph.nodes[1].id_ig(), Some(1));
        assert_eq!(graph.edges[0].source, 0);
        assert_eq!(graph.edges[0].target, 1);
        assert_eq!(graph.edges[0].length(), Some(12.5));
    }

    #[test]
    fn test_import_unknown_attribute_dropped() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <key id="v_ii" for="node" attr.name="ii" attr.type="string"/>
  <key id="v_x" for="node" attr.name="mystery" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <node id="n0"><data key="v_ii">0</data><data key="v_x">?</data></node>
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        assert_eq!(graph.nodes[0].id_ig(), Some(0));
        assert_eq!(graph.nodes[0].attrs.len(), 1);
    }

    #[test]
    fn test_import_malformed_column_kept_raw() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <key id="e_l" for="edge" attr.name="l" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <node id="n0"/>
    <node id="n1"/>
    <edge source="n0" target="n1"><data key="e_l">12.5</data></edge>
    <edge source="n1" target="n0"><data key="e_l">oops</data></edge>
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        // the whole column stays raw, including the well-formed value
        assert_eq!(graph.edges[0].length(), None);
        assert_eq!(
            graph.edges[0].get(EdgeAttr::Length),
            Some(&AttrValue::Raw("12.5".to_string()))
        );
        assert_eq!(
            graph.edges[1].get(EdgeAttr::Length),
            Some(&AttrValue::Raw("oops".to_string()))
        );
    }

    #[test]
    fn test_import_schema_drift_dropped() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <key id="v_ii" for="node" attr.name="ii" attr.type="string"/>
  <key id="v_tl" for="node" attr.name="tl" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <node id="n0"><data key="v_ii">0</data><data key="v_tl">1</data></node>
    <node id="n1"><data key="v_ii">1</data></node>
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        // tl is not uniform across nodes: dropped for the whole collection
        assert_eq!(graph.nodes[0].traffic_light(), None);
        assert_eq!(graph.nodes[0].id_ig(), Some(0));
        assert_eq!(graph.nodes[1].id_ig(), Some(1));
    }

    #[test]
    fn test_import_structural_id_discarded() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <key id="v_id" for="node" attr.name="id" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <node id="n0"><data key="v_id">n0</data></node>
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        assert!(graph.nodes[0].attrs.is_empty());
    }

    #[test]
    fn test_import_dangling_edge() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <graph id="G" edgedefault="directed">
    <node id="n0"/>
    <edge source="n0" target="n9"/>
  </graph>
</graphml>"#
        ));

        assert!(matches!(import_graphml(file.path()), Err(Error::Graph(_))));
    }

    #[test]
    fn test_import_empty_collections() {
        let file = write_temp(&format!(
            r#"{HEADER}
  <graph id="G" edgedefault="directed">
  </graph>
</graphml>"#
        ));

        let graph = import_graphml(file.path()).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_export_subset_missing_attr_fails() {
        let mut graph = Graph::new();
        graph.add_node(Node::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.graphml");

        let result = export_graphml(&graph, &path, Some(&[NodeAttr::IdIg]), None);
        assert!(matches!(result, Err(Error::Graph(_))));
    }
}
