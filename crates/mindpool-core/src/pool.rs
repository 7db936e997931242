//! Node and link pool: the authoritative document model.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identifier for nodes and links. Nodes and links share one counter,
/// so a uid is unique across both collections within a session.
pub type Uid = i64;

/// Sentinel uid for the cursor-follow target of an in-progress link drag.
pub const VIRTUAL_TARGET_UID: Uid = -1;

/// Default node background color.
pub const DEFAULT_NODE_BACKGROUND: &str = "#223344";
/// Default node text color.
pub const DEFAULT_NODE_COLOR: &str = "#ffffff";
/// Default link color.
pub const DEFAULT_LINK_COLOR: &str = "#808080";

/// How a node's text content is rendered by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeRenderer {
    #[default]
    Default,
    Markdown,
}

/// Which link painter a document requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkPainterId {
    #[default]
    StraightLine,
    BezierCurve,
}

/// A single node on the canvas.
///
/// A node does not store its own connectivity; links are separate records
/// in the pool and are looked up by scanning the link collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindNode {
    pub uid: Uid,
    /// Position in pool-space coordinates.
    #[serde(with = "point_array")]
    pub position: Point,
    pub text: String,
    /// CSS background value.
    pub background: String,
    /// CSS text color value.
    pub color: String,
    #[serde(default)]
    pub renderer: NodeRenderer,
}

/// A directed link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindLink {
    pub uid: Uid,
    /// Source node uid.
    pub source: Uid,
    /// Target node uid.
    pub target: Uid,
    pub text: String,
    pub color: String,
}

/// Field-wise patch for creating or modifying a node.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub position: Option<Point>,
    pub text: Option<String>,
    pub background: Option<String>,
    pub color: Option<String>,
    pub renderer: Option<NodeRenderer>,
}

impl NodePatch {
    /// Patch that only moves a node.
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// The aggregate root owning all nodes and links plus the view state
/// that is persisted with them.
#[derive(Debug, Clone)]
pub struct NodePool {
    nodes: HashMap<Uid, MindNode>,
    links: HashMap<Uid, MindLink>,
    uid_counter: Uid,
    /// Displacement of the pool origin from the surface center, in pixels.
    pub offset: Vec2,
    pub scale_factor: f64,
    pub link_painter_id: LinkPainterId,
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            links: HashMap::new(),
            uid_counter: 0,
            offset: Vec2::ZERO,
            scale_factor: 1.0,
            link_painter_id: LinkPainterId::default(),
        }
    }

    /// Allocate the next uid. Uids are monotonic and never reused
    /// within a session.
    fn gen_uid(&mut self) -> Uid {
        let uid = self.uid_counter;
        self.uid_counter += 1;
        uid
    }

    /// Current value of the shared uid counter.
    pub fn uid_counter(&self) -> Uid {
        self.uid_counter
    }

    /// Create a node by merging `data` over the default node template.
    /// Returns the new node's uid. Always succeeds.
    pub fn create_node(&mut self, data: NodePatch) -> Uid {
        let uid = self.gen_uid();
        let node = MindNode {
            uid,
            position: data.position.unwrap_or(Point::ZERO),
            text: data.text.unwrap_or_else(|| format!("#{uid}")),
            background: data
                .background
                .unwrap_or_else(|| DEFAULT_NODE_BACKGROUND.to_string()),
            color: data.color.unwrap_or_else(|| DEFAULT_NODE_COLOR.to_string()),
            renderer: data.renderer.unwrap_or_default(),
        };
        self.nodes.insert(uid, node);
        uid
    }

    /// Duplicate an existing node into a fresh uid at the same position,
    /// with the same text and style but no connectivity.
    /// Returns `None` if `uid` is unknown.
    pub fn copy_node(&mut self, uid: Uid) -> Option<Uid> {
        let source = self.nodes.get(&uid)?.clone();
        let new_uid = self.gen_uid();
        self.nodes.insert(
            new_uid,
            MindNode {
                uid: new_uid,
                ..source
            },
        );
        Some(new_uid)
    }

    /// Shallow-merge `patch` onto the node with `uid`.
    /// Returns false if the node does not exist.
    pub fn modify_node(&mut self, uid: Uid, patch: NodePatch) -> bool {
        let Some(node) = self.nodes.get_mut(&uid) else {
            return false;
        };
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(text) = patch.text {
            node.text = text;
        }
        if let Some(background) = patch.background {
            node.background = background;
        }
        if let Some(color) = patch.color {
            node.color = color;
        }
        if let Some(renderer) = patch.renderer {
            node.renderer = renderer;
        }
        true
    }

    /// Remove a node and every link that references it.
    pub fn remove_node_by_uid(&mut self, uid: Uid) -> Option<MindNode> {
        let node = self.nodes.remove(&uid)?;
        self.links
            .retain(|_, link| link.source != uid && link.target != uid);
        Some(node)
    }

    /// Create a directed link from `source` to `target`.
    ///
    /// Self-links and links with a missing endpoint are rejected with
    /// `None`. If the ordered pair is already linked the existing link
    /// is returned unchanged.
    pub fn create_link(&mut self, source: Uid, target: Uid) -> Option<&MindLink> {
        if source == target {
            return None;
        }
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return None;
        }
        if let Some(existing) = self
            .links
            .values()
            .find(|link| link.source == source && link.target == target)
        {
            let uid = existing.uid;
            return self.links.get(&uid);
        }

        let uid = self.gen_uid();
        self.links.insert(
            uid,
            MindLink {
                uid,
                source,
                target,
                text: String::new(),
                color: DEFAULT_LINK_COLOR.to_string(),
            },
        );
        self.links.get(&uid)
    }

    /// Remove the link for the ordered pair, returning it if it existed.
    pub fn remove_link(&mut self, source: Uid, target: Uid) -> Option<MindLink> {
        let uid = self
            .links
            .values()
            .find(|link| link.source == source && link.target == target)?
            .uid;
        self.links.remove(&uid)
    }

    /// Get a node by uid.
    pub fn node(&self, uid: Uid) -> Option<&MindNode> {
        self.nodes.get(&uid)
    }

    /// Get a link by uid.
    pub fn link(&self, uid: Uid) -> Option<&MindLink> {
        self.links.get(&uid)
    }

    /// Iterate over all nodes (unordered).
    pub fn nodes(&self) -> impl Iterator<Item = &MindNode> {
        self.nodes.values()
    }

    /// Iterate over all links (unordered).
    pub fn links(&self) -> impl Iterator<Item = &MindLink> {
        self.links.values()
    }

    /// All links leaving `uid`.
    pub fn links_of_source(&self, uid: Uid) -> Vec<&MindLink> {
        self.links.values().filter(|l| l.source == uid).collect()
    }

    /// All links arriving at `uid`.
    pub fn links_of_target(&self, uid: Uid) -> Vec<&MindLink> {
        self.links.values().filter(|l| l.target == uid).collect()
    }

    /// The unique link for the ordered pair, if any.
    pub fn link_between(&self, source: Uid, target: Uid) -> Option<&MindLink> {
        self.links
            .values()
            .find(|l| l.source == source && l.target == target)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether the pool holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Filter nodes by keyword against their text, either as a substring
    /// or as a regular expression. A malformed pattern is propagated to
    /// the caller.
    pub fn search_nodes(
        &self,
        keyword: &str,
        excluding: &HashSet<Uid>,
        use_regex: bool,
    ) -> Result<Vec<&MindNode>, regex::Error> {
        let pattern = if use_regex {
            Some(regex::Regex::new(keyword)?)
        } else {
            None
        };

        Ok(self
            .nodes
            .values()
            .filter(|node| !excluding.contains(&node.uid))
            .filter(|node| match &pattern {
                Some(regex) => regex.is_match(&node.text),
                None => node.text.contains(keyword),
            })
            .collect())
    }

    /// Replace the entire pool content. Used when loading a document;
    /// the caller is responsible for resetting any session state that
    /// references the old uids.
    pub fn replace(
        &mut self,
        nodes: Vec<MindNode>,
        links: Vec<MindLink>,
        uid_counter: Uid,
        offset: Vec2,
        scale_factor: f64,
        link_painter_id: LinkPainterId,
    ) {
        self.nodes.clear();
        self.links.clear();
        for node in nodes {
            self.nodes.insert(node.uid, node);
        }
        for link in links {
            self.links.insert(link.uid, link);
        }
        self.uid_counter = uid_counter;
        self.offset = offset;
        self.scale_factor = scale_factor;
        self.link_painter_id = link_painter_id;
    }
}

/// Serialize `kurbo::Point` as a `[x, y]` array, matching the on-disk
/// document format.
pub(crate) mod point_array {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        [point.x, point.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(Point::new(x, y))
    }
}

/// Serialize `kurbo::Vec2` as a `[x, y]` array.
pub(crate) mod vec2_array {
    use kurbo::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(vec: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        [vec.x, vec.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}
