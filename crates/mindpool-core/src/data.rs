//! On-disk document schema and version migration.
//!
//! Documents are JSON. The current schema is version 2; older documents
//! are migrated up through a chain of [`DataAdapter`]s before any typed
//! parsing happens, so a failed migration never touches editor state.
//!
//! Version history:
//! - v0: no `version` field, `scale` instead of `scaleFactor`,
//!   connectivity stored as per-node `inPorts`/`outPorts` uid arrays.
//! - v1: adds `version` and `linkPainterId`, renames `scale`.
//! - v2: drops the port arrays; links become standalone records.

use crate::pool::{LinkPainterId, MindLink, MindNode, Uid};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Schema version written by [`crate::editor::Editor::build_document`].
pub const CURRENT_VERSION: u32 = 2;

/// The full serialized state of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDocument {
    pub version: u32,
    pub link_painter_id: LinkPainterId,
    pub uid_counter: Uid,
    #[serde(with = "crate::pool::vec2_array")]
    pub offset: Vec2,
    pub scale_factor: f64,
    pub nodes: Vec<MindNode>,
    pub links: Vec<MindLink>,
}

impl Default for PoolDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            link_painter_id: LinkPainterId::default(),
            uid_counter: 0,
            offset: Vec2::ZERO,
            scale_factor: 1.0,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no migration path from version {from} to {to}")]
    UnsupportedVersion { from: u32, to: u32 },
    #[error("document is empty")]
    EmptyDocument,
}

/// One migration step between two schema versions, operating on raw
/// JSON so that steps compose without intermediate typed schemas.
pub trait DataAdapter {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn adapt(&self, source: Value) -> Result<Value, DataError>;
}

/// Migrates raw documents to the current schema version.
///
/// Adapters are registered per (source, target) pair; a request with no
/// direct adapter is served by chaining registered steps, searched in
/// ascending target-version order.
pub struct DataLoader {
    current_version: u32,
    adapters: HashMap<u32, BTreeMap<u32, Box<dyn DataAdapter>>>,
}

impl DataLoader {
    /// A loader with every known adapter registered.
    pub fn new() -> Self {
        let mut loader = Self::empty(CURRENT_VERSION);
        loader.add_adapter(Box::new(AdapterV0V1));
        loader.add_adapter(Box::new(AdapterV1V2));
        loader
    }

    /// A loader with no adapters, targeting `current_version`.
    pub fn empty(current_version: u32) -> Self {
        Self {
            current_version,
            adapters: HashMap::new(),
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn add_adapter(&mut self, adapter: Box<dyn DataAdapter>) {
        self.adapters
            .entry(adapter.source_version())
            .or_default()
            .insert(adapter.target_version(), adapter);
    }

    /// Parse a raw JSON document, migrating it first if it is older
    /// than the current version. A document without a `version` field
    /// is treated as version 0.
    pub fn load(&self, raw: Value) -> Result<PoolDocument, DataError> {
        if raw.is_null() {
            return Err(DataError::EmptyDocument);
        }

        let from = raw
            .get("version")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(0);

        let value = if from == self.current_version {
            raw
        } else {
            let chain =
                self.find_chain(from, self.current_version)
                    .ok_or(DataError::UnsupportedVersion {
                        from,
                        to: self.current_version,
                    })?;
            log::info!(
                "migrating document from version {from} to {} in {} step(s)",
                self.current_version,
                chain.len()
            );
            let mut data = raw;
            for adapter in chain {
                data = adapter.adapt(data)?;
            }
            data
        };

        Ok(serde_json::from_value(value)?)
    }

    /// Parse a raw JSON string through [`Self::load`].
    pub fn load_str(&self, raw: &str) -> Result<PoolDocument, DataError> {
        if raw.trim().is_empty() {
            return Err(DataError::EmptyDocument);
        }
        self.load(serde_json::from_str(raw)?)
    }

    fn find_chain(&self, from: u32, to: u32) -> Option<Vec<&dyn DataAdapter>> {
        self.find_chain_from(from, to, &mut HashSet::new())
    }

    // The visited set keeps adapter registrations that loop back to an
    // earlier version from recursing forever.
    fn find_chain_from(
        &self,
        from: u32,
        to: u32,
        visited: &mut HashSet<u32>,
    ) -> Option<Vec<&dyn DataAdapter>> {
        if !visited.insert(from) {
            return None;
        }
        let candidates = self.adapters.get(&from)?;
        if let Some(direct) = candidates.get(&to) {
            return Some(vec![direct.as_ref()]);
        }
        for (&mid, adapter) in candidates.range(..to) {
            if let Some(mut rest) = self.find_chain_from(mid, to, visited) {
                let mut chain = vec![adapter.as_ref()];
                chain.append(&mut rest);
                return Some(chain);
            }
        }
        None
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolV0 {
    uid_counter: Uid,
    offset: Value,
    scale: f64,
    nodes: Vec<Value>,
}

/// v0 → v1: stamp the version, default the link painter, rename
/// `scale`. Nodes pass through untouched, ports included.
struct AdapterV0V1;

impl DataAdapter for AdapterV0V1 {
    fn source_version(&self) -> u32 {
        0
    }

    fn target_version(&self) -> u32 {
        1
    }

    fn adapt(&self, source: Value) -> Result<Value, DataError> {
        let pool: PoolV0 = serde_json::from_value(source)?;
        Ok(serde_json::json!({
            "version": 1,
            "linkPainterId": LinkPainterId::default(),
            "uidCounter": pool.uid_counter,
            "offset": pool.offset,
            "scaleFactor": pool.scale,
            "nodes": pool.nodes,
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolV1 {
    link_painter_id: Value,
    uid_counter: Uid,
    offset: Value,
    scale_factor: f64,
    nodes: Vec<NodeV1>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeV1 {
    uid: Uid,
    position: Value,
    text: String,
    background: String,
    color: String,
    #[serde(default)]
    renderer: Option<String>,
    #[serde(default)]
    out_ports: Vec<Uid>,
    // Redundant with outPorts; dropped by the migration.
    #[serde(default)]
    #[allow(dead_code)]
    in_ports: Vec<Uid>,
}

/// v1 → v2: drop the per-node port arrays and synthesize one link
/// record per outbound port, numbered from the document's uid counter.
struct AdapterV1V2;

impl DataAdapter for AdapterV1V2 {
    fn source_version(&self) -> u32 {
        1
    }

    fn target_version(&self) -> u32 {
        2
    }

    fn adapt(&self, source: Value) -> Result<Value, DataError> {
        let pool: PoolV1 = serde_json::from_value(source)?;

        let mut uid_counter = pool.uid_counter;
        let mut nodes = Vec::with_capacity(pool.nodes.len());
        let mut links = Vec::new();

        for old in &pool.nodes {
            let mut node = serde_json::json!({
                "uid": old.uid,
                "position": old.position,
                "text": old.text,
                "background": old.background,
                "color": old.color,
            });
            if let Some(renderer) = &old.renderer {
                node["renderer"] = Value::from(renderer.clone());
            }
            nodes.push(node);

            for &target in &old.out_ports {
                let uid = uid_counter;
                uid_counter += 1;
                links.push(serde_json::json!({
                    "uid": uid,
                    "source": old.uid,
                    "target": target,
                    "text": "",
                    "color": "black",
                }));
            }
        }

        Ok(serde_json::json!({
            "version": 2,
            "linkPainterId": pool.link_painter_id,
            "uidCounter": uid_counter,
            "offset": pool.offset,
            "scaleFactor": pool.scale_factor,
            "nodes": nodes,
            "links": links,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use serde_json::json;

    fn v0_document() -> Value {
        json!({
            "uidCounter": 3,
            "offset": [12.0, -4.0],
            "scale": 1.5,
            "nodes": [
                {
                    "uid": 1,
                    "position": [0.0, 0.0],
                    "text": "root",
                    "background": "#223344",
                    "color": "#ffffff",
                    "outPorts": [2],
                    "inPorts": []
                },
                {
                    "uid": 2,
                    "position": [100.0, 50.0],
                    "text": "child",
                    "background": "#223344",
                    "color": "#ffffff",
                    "outPorts": [],
                    "inPorts": [1]
                }
            ]
        })
    }

    #[test]
    fn test_current_version_passes_through() {
        let loader = DataLoader::new();
        let document = loader
            .load(serde_json::to_value(PoolDocument::default()).unwrap())
            .unwrap();
        assert_eq!(document, PoolDocument::default());
    }

    #[test]
    fn test_missing_version_migrates_from_zero() {
        let loader = DataLoader::new();
        let document = loader.load(v0_document()).unwrap();

        assert_eq!(document.version, 2);
        assert_eq!(document.link_painter_id, LinkPainterId::StraightLine);
        assert_eq!(document.scale_factor, 1.5);
        assert_eq!(document.offset, Vec2::new(12.0, -4.0));
        assert_eq!(document.nodes.len(), 2);
        assert_eq!(document.nodes[0].position, Point::ZERO);
        assert_eq!(document.nodes[1].position, Point::new(100.0, 50.0));

        // The outPort became a standalone link with a fresh uid.
        assert_eq!(document.links.len(), 1);
        let link = &document.links[0];
        assert_eq!(link.uid, 3);
        assert_eq!(link.source, 1);
        assert_eq!(link.target, 2);
        assert_eq!(link.color, "black");
        // The counter advanced past the synthesized link.
        assert_eq!(document.uid_counter, 4);
    }

    #[test]
    fn test_v1_to_v2_single_step() {
        let loader = DataLoader::new();
        let document = loader
            .load(json!({
                "version": 1,
                "linkPainterId": "bezier_curve",
                "uidCounter": 2,
                "offset": [0.0, 0.0],
                "scaleFactor": 1.0,
                "nodes": [
                    {
                        "uid": 1,
                        "position": [5.0, 5.0],
                        "text": "solo",
                        "background": "#223344",
                        "color": "#ffffff",
                        "renderer": "markdown",
                        "outPorts": [],
                        "inPorts": []
                    }
                ]
            }))
            .unwrap();

        assert_eq!(document.link_painter_id, LinkPainterId::BezierCurve);
        assert_eq!(
            document.nodes[0].renderer,
            crate::pool::NodeRenderer::Markdown
        );
        assert!(document.links.is_empty());
    }

    #[test]
    fn test_unsupported_version() {
        let loader = DataLoader::new();
        let err = loader.load(json!({ "version": 99 })).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnsupportedVersion { from: 99, to: 2 }
        ));
    }

    #[test]
    fn test_no_backward_migration() {
        // A loader pinned below the document's version cannot go back.
        let mut loader = DataLoader::empty(1);
        loader.add_adapter(Box::new(AdapterV0V1));
        let err = loader.load(json!({ "version": 2 })).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnsupportedVersion { from: 2, to: 1 }
        ));
    }

    #[test]
    fn test_malformed_document() {
        let loader = DataLoader::new();
        assert!(matches!(
            loader.load(json!({ "version": 2, "nodes": "oops" })),
            Err(DataError::Malformed(_))
        ));
        assert!(matches!(
            loader.load(Value::Null),
            Err(DataError::EmptyDocument)
        ));
        assert!(matches!(
            loader.load_str("   "),
            Err(DataError::EmptyDocument)
        ));
        assert!(matches!(
            loader.load_str("{not json"),
            Err(DataError::Malformed(_))
        ));
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let document = PoolDocument {
            offset: Vec2::new(1.0, 2.0),
            ..PoolDocument::default()
        };
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["version"], 2);
        assert_eq!(value["linkPainterId"], "straight_line");
        assert_eq!(value["uidCounter"], 0);
        assert_eq!(value["scaleFactor"], 1.0);
        assert_eq!(value["offset"], json!([1.0, 2.0]));
    }

    #[test]
    fn test_cyclic_adapter_registration_terminates() {
        struct LoopAdapter;

        impl DataAdapter for LoopAdapter {
            fn source_version(&self) -> u32 {
                0
            }
            fn target_version(&self) -> u32 {
                0
            }
            fn adapt(&self, source: Value) -> Result<Value, DataError> {
                Ok(source)
            }
        }

        // A self-loop alone reaches nothing.
        let mut loader = DataLoader::empty(2);
        loader.add_adapter(Box::new(LoopAdapter));
        assert!(matches!(
            loader.load(v0_document()),
            Err(DataError::UnsupportedVersion { from: 0, to: 2 })
        ));

        // And it does not shadow a valid chain either.
        let mut loader = DataLoader::empty(2);
        loader.add_adapter(Box::new(LoopAdapter));
        loader.add_adapter(Box::new(AdapterV0V1));
        loader.add_adapter(Box::new(AdapterV1V2));
        assert!(loader.load(v0_document()).is_ok());
    }

    #[test]
    fn test_chain_search_skips_gaps() {
        // 0→1 and 1→2 compose even though 0→2 was never registered.
        let mut loader = DataLoader::empty(2);
        loader.add_adapter(Box::new(AdapterV0V1));
        loader.add_adapter(Box::new(AdapterV1V2));
        assert!(loader.load(v0_document()).is_ok());

        // Without the second hop the chain cannot be completed.
        let mut partial = DataLoader::empty(2);
        partial.add_adapter(Box::new(AdapterV0V1));
        assert!(matches!(
            partial.load(v0_document()),
            Err(DataError::UnsupportedVersion { from: 0, to: 2 })
        ));
    }
}
