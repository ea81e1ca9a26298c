//! Declarative graph schema.
//!
//! Every vertex, edge and incidence class gets a unique, non-zero type id.
//! Schemas are written by hand in TOML or JSON, or assembled with the
//! builder methods below.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{AttrKind, AttrValue};
use crate::types::{GraphError, Result, TypeId};

/// Direction of an incidence relative to its edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The vertex is the edge's source.
    Out,
    /// The vertex is the edge's target.
    In,
}

/// Aggregation semantics of the vertex at one end of an edge.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    /// Plain association.
    #[default]
    None,
    /// Shared aggregation; no delete propagation.
    Shared,
    /// Composition: the vertex at this end owns the vertex at the other end.
    Composite,
}

/// One declared attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name, unique within its type.
    pub name: String,
    /// Declared kind.
    pub kind: AttrKind,
    /// Value of fresh elements; the kind's zero value when absent.
    #[serde(default)]
    pub default: Option<AttrValue>,
}

impl AttributeDef {
    /// Attribute without an explicit default.
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: AttrValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// Vertex or edge class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementTypeDef {
    /// Type id.
    pub id: u32,
    /// Class name.
    pub name: String,
    /// Declared attributes in storage order.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

/// Incidence class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncidenceTypeDef {
    /// Type id.
    pub id: u32,
    /// Class name.
    pub name: String,
    /// Direction relative to the edge.
    pub direction: Direction,
    /// Aggregation of the vertex at this end.
    #[serde(default)]
    pub aggregation: AggregationKind,
}

fn default_graph_type() -> u32 {
    1
}

/// A complete graph schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Type id recorded for complete and partial graphs.
    #[serde(default = "default_graph_type")]
    pub graph_type: u32,
    /// Vertex classes.
    #[serde(default)]
    pub vertex_types: Vec<ElementTypeDef>,
    /// Edge classes.
    #[serde(default)]
    pub edge_types: Vec<ElementTypeDef>,
    /// Incidence classes.
    #[serde(default)]
    pub incidence_types: Vec<IncidenceTypeDef>,
}

/// Largest type id a schema may declare. Profiles are indexed by type id.
pub const MAX_TYPE_ID: u32 = u16::MAX as u32;

impl Schema {
    /// Empty schema; the graph type id is 1, so element types start above it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph_type: default_graph_type(),
            vertex_types: Vec::new(),
            edge_types: Vec::new(),
            incidence_types: Vec::new(),
        }
    }

    /// Adds a vertex class.
    pub fn vertex_type(
        mut self,
        id: u32,
        name: impl Into<String>,
        attributes: Vec<AttributeDef>,
    ) -> Self {
        self.vertex_types.push(ElementTypeDef {
            id,
            name: name.into(),
            attributes,
        });
        self
    }

    /// Adds an edge class.
    pub fn edge_type(
        mut self,
        id: u32,
        name: impl Into<String>,
        attributes: Vec<AttributeDef>,
    ) -> Self {
        self.edge_types.push(ElementTypeDef {
            id,
            name: name.into(),
            attributes,
        });
        self
    }

    /// Adds an incidence class.
    pub fn incidence_type(
        mut self,
        id: u32,
        name: impl Into<String>,
        direction: Direction,
        aggregation: AggregationKind,
    ) -> Self {
        self.incidence_types.push(IncidenceTypeDef {
            id,
            name: name.into(),
            direction,
            aggregation,
        });
        self
    }

    /// Parses a TOML schema document.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let schema: Schema =
            toml::from_str(src).map_err(|err| GraphError::Config(format!("schema: {err}")))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parses a JSON schema document.
    pub fn from_json_str(src: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(src)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Loads a schema file; `.json` files are read as JSON, everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&src),
            _ => Self::from_toml_str(&src),
        }
    }

    /// Checks that every type id is non-zero, unique and at most
    /// [`MAX_TYPE_ID`].
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        seen.insert(self.graph_type);
        let ids = self
            .vertex_types
            .iter()
            .map(|t| t.id)
            .chain(self.edge_types.iter().map(|t| t.id))
            .chain(self.incidence_types.iter().map(|t| t.id));
        for id in ids {
            if id == 0 {
                return Err(GraphError::Config("type id 0 is reserved".into()));
            }
            if id > MAX_TYPE_ID {
                return Err(GraphError::Config(format!(
                    "type id {id} exceeds {MAX_TYPE_ID}"
                )));
            }
            if !seen.insert(id) {
                return Err(GraphError::Config(format!("duplicate type id {id}")));
            }
        }
        Ok(())
    }

    /// Looks up a vertex class by name.
    pub fn vertex_type_id(&self, name: &str) -> Option<TypeId> {
        self.vertex_types
            .iter()
            .find(|t| t.name == name)
            .map(|t| TypeId(t.id))
    }

    /// Looks up an edge class by name.
    pub fn edge_type_id(&self, name: &str) -> Option<TypeId> {
        self.edge_types
            .iter()
            .find(|t| t.name == name)
            .map(|t| TypeId(t.id))
    }

    /// Looks up an incidence class by name.
    pub fn incidence_type_id(&self, name: &str) -> Option<TypeId> {
        self.incidence_types
            .iter()
            .find(|t| t.name == name)
            .map(|t| TypeId(t.id))
    }
}
