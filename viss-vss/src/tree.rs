use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::VssError;

/// Maximum number of matches a single [`VssTree::search`] call may return.
///
/// This cap belongs to the adapter, not to each caller — see spec.md §9's
/// design note on the original's fixed-size `searchData_t[150]` buffer.
pub const MAX_MATCHES: usize = 150;

/// Node and data-type tags from the VSS data model (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Double,
    Float,
    Boolean,
    String,
    Sensor,
    Actuator,
    Stream,
    Attribute,
    Branch,
}

/// Alias kept distinct from [`NodeType`] at the API boundary even though
/// both reuse the same tag set — a leaf's `dataType` and its `nodeType`
/// answer different questions (primitive representation vs. VSS role).
pub type DataType = NodeType;

/// Access-restriction tag semantics from spec.md §3: 0 = none, 1 = write
/// requires a token, 2 = read and write require a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessRestriction {
    None = 0,
    WriteRestricted = 1,
    ReadWriteRestricted = 2,
}

impl AccessRestriction {
    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => AccessRestriction::None,
            1 => AccessRestriction::WriteRestricted,
            _ => AccessRestriction::ReadWriteRestricted,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    datatype: Option<DataType>,
    #[serde(default)]
    access: u8,
    #[serde(default)]
    children: Vec<RawNode>,
}

#[derive(Debug)]
struct VssNode {
    name: String,
    description: String,
    node_type: NodeType,
    data_type: Option<DataType>,
    access: AccessRestriction,
    children: Vec<Arc<VssNode>>,
}

impl From<RawNode> for VssNode {
    fn from(raw: RawNode) -> Self {
        VssNode {
            name: raw.name,
            description: raw.description,
            node_type: raw.node_type,
            data_type: raw.datatype,
            access: AccessRestriction::from_tag(raw.access),
            children: raw.children.into_iter().map(|c| Arc::new(c.into())).collect(),
        }
    }
}

impl VssNode {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Opaque handle to a resolved node, per spec.md §9's "typed adapter"
/// redesign note — callers never see a raw pointer.
#[derive(Debug, Clone)]
pub struct NodeHandle(Arc<VssNode>);

/// One resolved match from [`VssTree::search`].
#[derive(Debug, Clone)]
pub struct Match {
    pub resolved_path: String,
    pub node: NodeHandle,
}

/// Result of a [`VssTree::search`] call.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub matches: Vec<Match>,
    pub access_restriction: AccessRestriction,
}

impl Default for AccessRestriction {
    fn default() -> Self {
        AccessRestriction::None
    }
}

/// Node metadata as returned by [`VssTree::metadata`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeMetadata {
    pub name: String,
    pub description: String,
    pub node_type: NodeType,
    pub data_type: Option<DataType>,
    pub children: Vec<String>,
}

/// Opaque, read-only handle over a pre-built vehicle-signal schema.
///
/// Loaded once at startup from a JSON schema document and never mutated —
/// `search`/`metadata`/`enumerate_leaf_paths` are all safe to call
/// concurrently from many tasks (spec.md §5).
pub struct VssTree {
    root: Arc<VssNode>,
}

impl VssTree {
    /// Load a VSS tree from a JSON schema file.
    pub fn load(schema_path: impl AsRef<Path>) -> Result<Self, VssError> {
        let path = schema_path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| VssError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let root: RawNode = serde_json::from_str(&raw).map_err(|source| VssError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(VssTree {
            root: Arc::new(root.into()),
        })
    }

    /// Handle to the schema's root node (e.g. `Vehicle`).
    pub fn root(&self) -> NodeHandle {
        NodeHandle(self.root.clone())
    }

    /// Search the tree for `path`, relative to `root`.
    ///
    /// `any_depth` expands to every descendant of the resolved prefix node;
    /// `leaf_only` restricts matches to nodes with no children. Matches are
    /// depth-first in child-declaration order and capped at
    /// `max_matches.min(MAX_MATCHES)`. A zero-match search is a valid
    /// result, not an error.
    pub fn search(
        &self,
        root: &NodeHandle,
        path: &str,
        max_matches: usize,
        any_depth: bool,
        leaf_only: bool,
    ) -> SearchResult {
        let cap = max_matches.min(MAX_MATCHES);
        let segments: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').collect()
        };
        if segments.is_empty() {
            return SearchResult::default();
        }

        let prefix = if any_depth {
            &segments[..segments.len() - 1]
        } else {
            &segments[..]
        };

        let Some((prefix_node, prefix_path)) = navigate(&root.0, prefix) else {
            return SearchResult::default();
        };

        let mut matches = Vec::new();
        if any_depth {
            collect_descendants(&prefix_node, &prefix_path, leaf_only, cap, &mut matches);
        } else if !leaf_only || prefix_node.is_leaf() {
            matches.push(Match {
                resolved_path: prefix_path,
                node: NodeHandle(prefix_node),
            });
        }

        let access_restriction = matches
            .iter()
            .map(|m| m.node.0.access)
            .max()
            .unwrap_or_default();

        SearchResult {
            matches,
            access_restriction,
        }
    }

    /// Metadata for a single resolved node.
    pub fn metadata(&self, handle: &NodeHandle) -> NodeMetadata {
        let node = &handle.0;
        NodeMetadata {
            name: node.name.clone(),
            description: node.description.clone(),
            node_type: node.node_type,
            data_type: node.data_type,
            children: node.children.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// All leaf paths under `root`, sorted and deduplicated.
    pub fn enumerate_leaf_paths(&self, root: &NodeHandle) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaf_paths(&root.0, &root.0.name, &mut out);
        out.sort();
        out.dedup();
        out
    }

    /// Render the subtree rooted at `handle` as the JSON metadata shape
    /// used by the `$spec` filter (spec.md §4.H step 2), depth-limited to
    /// `max_depth` (0 means unbounded, capped at 100 per spec.md §8).
    pub fn metadata_tree(&self, handle: &NodeHandle, max_depth: usize) -> serde_json::Value {
        let max_depth = if max_depth == 0 { 100 } else { max_depth.min(100) };
        node_to_json(&handle.0, 0, max_depth)
    }
}

fn navigate(root: &Arc<VssNode>, segments: &[&str]) -> Option<(Arc<VssNode>, String)> {
    if segments.is_empty() {
        return Some((root.clone(), root.name.clone()));
    }
    if segments[0] != root.name {
        return None;
    }
    let mut current = root.clone();
    let mut path = root.name.clone();
    for seg in &segments[1..] {
        let next = current.children.iter().find(|c| c.name == *seg)?.clone();
        path.push('.');
        path.push_str(seg);
        current = next;
    }
    Some((current, path))
}

fn collect_descendants(
    node: &Arc<VssNode>,
    node_path: &str,
    leaf_only: bool,
    cap: usize,
    out: &mut Vec<Match>,
) {
    if out.len() >= cap {
        return;
    }
    for child in &node.children {
        if out.len() >= cap {
            return;
        }
        let child_path = format!("{node_path}.{}", child.name);
        if !leaf_only || child.is_leaf() {
            out.push(Match {
                resolved_path: child_path.clone(),
                node: NodeHandle(child.clone()),
            });
        }
        collect_descendants(child, &child_path, leaf_only, cap, out);
    }
}

fn collect_leaf_paths(node: &Arc<VssNode>, node_path: &str, out: &mut Vec<String>) {
    if node.is_leaf() {
        out.push(node_path.to_string());
        return;
    }
    for child in &node.children {
        let child_path = format!("{node_path}.{}", child.name);
        collect_leaf_paths(child, &child_path, out);
    }
}

fn node_to_json(node: &Arc<VssNode>, depth: usize, max_depth: usize) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".into(), serde_json::to_value(node.node_type).unwrap());
    obj.insert("description".into(), node.description.clone().into());
    if let Some(dt) = node.data_type {
        obj.insert("datatype".into(), serde_json::to_value(dt).unwrap());
    }
    if depth + 1 < max_depth && !node.children.is_empty() {
        let mut children = serde_json::Map::new();
        for child in &node.children {
            children.insert(child.name.clone(), node_to_json(child, depth + 1, max_depth));
        }
        obj.insert("children".into(), serde_json::Value::Object(children));
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(json: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    fn sample_schema() -> &'static str {
        r#"
        {
          "name": "Vehicle",
          "type": "branch",
          "description": "Vehicle root",
          "children": [
            {
              "name": "Speed",
              "type": "sensor",
              "datatype": "float",
              "description": "Vehicle speed",
              "access": 0
            },
            {
              "name": "Cabin",
              "type": "branch",
              "description": "Cabin",
              "children": [
                {
                  "name": "Door",
                  "type": "branch",
                  "description": "Door",
                  "children": [
                    {
                      "name": "Row1",
                      "type": "branch",
                      "description": "Row1",
                      "children": [
                        {
                          "name": "Left",
                          "type": "branch",
                          "description": "Left",
                          "children": [
                            {
                              "name": "IsOpen",
                              "type": "actuator",
                              "datatype": "boolean",
                              "description": "Door open state",
                              "access": 0
                            }
                          ]
                        },
                        {
                          "name": "Right",
                          "type": "branch",
                          "description": "Right",
                          "children": [
                            {
                              "name": "IsOpen",
                              "type": "actuator",
                              "datatype": "boolean",
                              "description": "Door open state",
                              "access": 0
                            }
                          ]
                        }
                      ]
                    }
                  ]
                }
              ]
            },
            {
              "name": "Door",
              "type": "branch",
              "description": "Legacy door lock",
              "children": [
                {
                  "name": "Lock",
                  "type": "actuator",
                  "datatype": "boolean",
                  "description": "Door lock",
                  "access": 1
                }
              ]
            }
          ]
        }
        "#
    }

    #[test]
    fn load_missing_file_errors() {
        let err = VssTree::load("/nonexistent/vss.json").unwrap_err();
        assert!(matches!(err, VssError::Io { .. }));
    }

    #[test]
    fn load_malformed_file_errors() {
        let f = write_schema("not json");
        let err = VssTree::load(f.path()).unwrap_err();
        assert!(matches!(err, VssError::Parse { .. }));
    }

    #[test]
    fn exact_path_search_finds_single_leaf() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let result = tree.search(&root, "Vehicle.Speed", 150, false, true);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].resolved_path, "Vehicle.Speed");
        assert_eq!(result.access_restriction, AccessRestriction::None);
    }

    #[test]
    fn wildcard_search_finds_two_leaves_in_declaration_order() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let result = tree.search(&root, "Vehicle.Cabin.Door.*", 150, true, true);
        let paths: Vec<_> = result.matches.iter().map(|m| m.resolved_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                "Vehicle.Cabin.Door.Row1.Left.IsOpen",
                "Vehicle.Cabin.Door.Row1.Right.IsOpen",
            ]
        );
    }

    #[test]
    fn empty_path_is_zero_matches_not_an_error() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let result = tree.search(&root, "", 150, false, true);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn access_restriction_is_max_across_matches() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let result = tree.search(&root, "Vehicle.Door.*", 150, true, true);
        assert_eq!(result.access_restriction, AccessRestriction::WriteRestricted);
    }

    #[test]
    fn enumerate_leaf_paths_sorted_and_deduplicated() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let leaves = tree.enumerate_leaf_paths(&root);
        let mut expected = leaves.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(leaves, expected);
        assert!(leaves.contains(&"Vehicle.Speed".to_string()));
    }

    #[test]
    fn metadata_tree_depth_limited() {
        let f = write_schema(sample_schema());
        let tree = VssTree::load(f.path()).unwrap();
        let root = tree.root();
        let cabin = tree
            .search(&root, "Vehicle.Cabin", 150, false, false)
            .matches
            .remove(0)
            .node;
        let tree_json = tree.metadata_tree(&cabin, 2);
        assert!(tree_json.get("children").is_some());
        let door = &tree_json["children"]["Door"];
        // depth-limited to two levels: Door itself has no nested "children" key
        assert!(door.get("children").is_none());
    }
}
