//! Question graph loading
//!
//! Reads a graph file (JSON or TOML map of node id -> node record), builds the
//! read-only store and rejects graphs with integrity defects.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{Node, NodeGraph};
use crate::infrastructure::traits::FileSystem;

/// Serialization of a graph file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Toml,
}

impl GraphFormat {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Service for loading and validating question graphs.
pub struct GraphLoader {
    fs: Arc<dyn FileSystem>,
    root: String,
}

impl GraphLoader {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<String>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Load, build and validate a graph file.
    pub fn load(&self, path: &Path) -> ApplicationResult<NodeGraph> {
        debug!("load: path={}", path.display());
        let graph = self.load_unchecked(path)?;
        graph.validate(&self.root)?;
        debug!("load: {} nodes", graph.len());
        Ok(graph)
    }

    /// Load and build a graph without integrity validation.
    ///
    /// Used by `graph validate` to report every defect instead of failing on the first.
    pub fn load_unchecked(&self, path: &Path) -> ApplicationResult<NodeGraph> {
        let format =
            GraphFormat::from_path(path).ok_or_else(|| ApplicationError::UnsupportedFormat(path.to_path_buf()))?;
        let content = self.fs.read_to_string(path).with_path_context("read graph", path)?;
        let graph = Self::parse(&content, format).map_err(|e| match e {
            ApplicationError::OperationFailed { source, .. } => ApplicationError::OperationFailed {
                context: format!("parse graph {}", path.display()),
                source,
            },
            other => other,
        })?;
        if graph.is_empty() {
            warn!("graph {} contains no nodes", path.display());
        }
        Ok(graph)
    }

    /// Parse graph text in the given format.
    pub fn parse(content: &str, format: GraphFormat) -> ApplicationResult<NodeGraph> {
        let map: BTreeMap<String, Node> = match format {
            GraphFormat::Json => serde_json::from_str(content).map_err(|e| ApplicationError::OperationFailed {
                context: "parse graph json".to_string(),
                source: Box::new(e),
            })?,
            GraphFormat::Toml => toml::from_str(content).map_err(|e| ApplicationError::OperationFailed {
                context: "parse graph toml".to_string(),
                source: Box::new(e),
            })?,
        };
        Ok(NodeGraph::from_map(map)?)
    }
}
