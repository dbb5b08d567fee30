//! Host-facing data model.
//!
//! The data-management host identifies one measurable time series by a
//! catalog / resource / representation triple. All of these are read-only
//! inputs: the writer derives physical names from them but never mutates
//! them.

/// Logical namespace path, e.g. `/Vehicle/Brakes`, with an optional opaque
/// metadata blob that ends up as the catalog group's `properties` text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Namespace path with `/` separators.
    pub path: String,
    /// Opaque host metadata, stored verbatim.
    pub properties: Option<String>,
}

impl Catalog {
    /// Create a catalog without metadata.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: None,
        }
    }

    /// Attach the host metadata blob.
    pub fn with_properties(mut self, blob: impl Into<String>) -> Self {
        self.properties = Some(blob.into());
        self
    }
}

/// Named channel inside a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Named encoding/sampling variant of a resource.
///
/// Parameters are an ordered key/value list; their order is part of the
/// identity since it determines the physical dataset-name suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    pub id: String,
    pub parameters: Vec<(String, String)>,
}

impl Representation {
    /// Create a representation without parameters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter, preserving insertion order.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}

/// Identifies one destination dataset inside the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub catalog: Catalog,
    pub resource: Resource,
    pub representation: Representation,
}

impl CatalogItem {
    pub fn new(catalog: Catalog, resource: Resource, representation: Representation) -> Self {
        Self {
            catalog,
            resource,
            representation,
        }
    }
}

/// One contiguous ordered batch of float64 samples destined for a single
/// dataset, placed at the write call's time offset.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub item: CatalogItem,
    pub samples: Vec<f64>,
}

impl WriteRequest {
    pub fn new(item: CatalogItem, samples: Vec<f64>) -> Self {
        Self { item, samples }
    }
}
