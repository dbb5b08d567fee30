//! In-memory container engine.
//!
//! Holds the whole group/dataset tree in memory and dumps it to the backing
//! file on flush, after the reserved 512-byte leading block. The dump format
//! is the engine's own little-endian tree encoding; the read accessors work
//! against the in-memory tree and exist mainly for inspection and tests.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{AttrValue, ContainerStore, ElementType, NodeId, ObjectRef};
use crate::util::{Error, Result};

/// Bytes reserved at the start of the file for the caller's preamble.
pub const RESERVED_LEADING_BYTES: u64 = 512;

const DUMP_MAGIC: &[u8; 4] = b"MEMC";
const DUMP_VERSION: u16 = 1;

#[derive(Debug, Clone)]
enum DataBuf {
    F64(Vec<f64>),
    U16(Vec<u16>),
    Ref(Vec<NodeId>),
}

#[derive(Debug, Clone)]
enum NodeKind {
    Group { children: Vec<(String, NodeId)> },
    Dataset { extent: u64, chunk_len: u64, data: DataBuf },
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    attrs: Vec<(String, AttrValue)>,
    kind: NodeKind,
}

/// In-memory hierarchical container over a single backing file.
pub struct MemStore {
    file: File,
    nodes: Vec<Node>,
}

impl MemStore {
    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id as usize)
            .ok_or_else(|| Error::store(format!("no node with id {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id as usize)
            .ok_or_else(|| Error::store(format!("no node with id {id}")))
    }

    fn group_children(&self, id: NodeId) -> Result<&[(String, NodeId)]> {
        match &self.node(id)?.kind {
            NodeKind::Group { children } => Ok(children),
            NodeKind::Dataset { .. } => {
                Err(Error::store(format!("node {id} is a dataset, not a group")))
            }
        }
    }

    fn add_child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId> {
        if self.lookup(parent, name).is_some() {
            return Err(Error::store(format!(
                "`{name}` already exists in group {parent}"
            )));
        }
        if !matches!(self.node(parent)?.kind, NodeKind::Group { .. }) {
            return Err(Error::store(format!(
                "cannot add `{name}` under dataset node {parent}"
            )));
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            name: name.to_string(),
            attrs: Vec::new(),
            kind,
        });
        if let NodeKind::Group { children } = &mut self.node_mut(parent)?.kind {
            children.push((name.to_string(), id));
        }
        Ok(id)
    }

    /// Child lookup by name. `None` when the parent has no such child or is
    /// not a group.
    pub fn lookup(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes.get(parent as usize)?.kind {
            NodeKind::Group { children } => children
                .iter()
                .find(|(n, _)| n == name)
                .map(|&(_, id)| id),
            NodeKind::Dataset { .. } => None,
        }
    }

    /// Read a named attribute.
    pub fn read_attr(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
        self.nodes
            .get(node as usize)?
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Full float64 contents of a dataset.
    pub fn read_f64(&self, dataset: NodeId) -> Result<&[f64]> {
        match &self.node(dataset)?.kind {
            NodeKind::Dataset { data: DataBuf::F64(buf), .. } => Ok(buf),
            _ => Err(Error::store(format!("node {dataset} is not a float64 dataset"))),
        }
    }

    /// Full uint16 contents of a dataset.
    pub fn read_u16(&self, dataset: NodeId) -> Result<&[u16]> {
        match &self.node(dataset)?.kind {
            NodeKind::Dataset { data: DataBuf::U16(buf), .. } => Ok(buf),
            _ => Err(Error::store(format!("node {dataset} is not a uint16 dataset"))),
        }
    }

    /// First reference stored in a reference dataset.
    pub fn read_ref(&self, dataset: NodeId) -> Result<ObjectRef> {
        match &self.node(dataset)?.kind {
            NodeKind::Dataset { data: DataBuf::Ref(buf), .. } => buf
                .first()
                .map(|&id| ObjectRef(id))
                .ok_or_else(|| Error::store(format!("reference dataset {dataset} is empty"))),
            _ => Err(Error::store(format!("node {dataset} is not a reference dataset"))),
        }
    }

    /// Resolve an object reference back to its node.
    pub fn deref(&self, reference: ObjectRef) -> Result<NodeId> {
        self.node(reference.0).map(|_| reference.0)
    }

    /// Declared extent of a dataset.
    pub fn extent(&self, dataset: NodeId) -> Result<u64> {
        match &self.node(dataset)?.kind {
            NodeKind::Dataset { extent, .. } => Ok(*extent),
            NodeKind::Group { .. } => Err(Error::store(format!("node {dataset} is a group"))),
        }
    }

    /// Declared chunk length of a dataset.
    pub fn chunk_len(&self, dataset: NodeId) -> Result<u64> {
        match &self.node(dataset)?.kind {
            NodeKind::Dataset { chunk_len, .. } => Ok(*chunk_len),
            NodeKind::Group { .. } => Err(Error::store(format!("node {dataset} is a group"))),
        }
    }

    /// Names of a group's children, in creation order.
    pub fn child_names(&self, group: NodeId) -> Result<Vec<String>> {
        Ok(self
            .group_children(group)?
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

}

impl ContainerStore for MemStore {
    fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        // Reserve the leading block for the caller's preamble.
        file.write_all(&[0u8; RESERVED_LEADING_BYTES as usize])?;

        Ok(Self {
            file,
            nodes: vec![Node {
                name: String::new(),
                attrs: Vec::new(),
                kind: NodeKind::Group { children: Vec::new() },
            }],
        })
    }

    fn root(&self) -> NodeId {
        0
    }

    fn ensure_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        if let Some(existing) = self.lookup(parent, name) {
            match self.node(existing)?.kind {
                NodeKind::Group { .. } => return Ok(existing),
                NodeKind::Dataset { .. } => {
                    return Err(Error::store(format!(
                        "`{name}` already exists as a dataset"
                    )))
                }
            }
        }
        self.add_child(parent, name, NodeKind::Group { children: Vec::new() })
    }

    fn create_dataset(
        &mut self,
        parent: NodeId,
        name: &str,
        element: ElementType,
        extent: u64,
        chunk_len: u64,
    ) -> Result<NodeId> {
        let data = match element {
            ElementType::Float64 => DataBuf::F64(vec![0.0; extent as usize]),
            ElementType::Uint16 => DataBuf::U16(vec![0; extent as usize]),
            ElementType::Reference => DataBuf::Ref(vec![0; extent as usize]),
        };
        self.add_child(parent, name, NodeKind::Dataset { extent, chunk_len, data })
    }

    fn write_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> Result<()> {
        let attrs = &mut self.node_mut(node)?.attrs;
        if let Some(slot) = attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            attrs.push((name.to_string(), value));
        }
        Ok(())
    }

    fn write_f64_slab(&mut self, dataset: NodeId, offset: u64, samples: &[f64]) -> Result<()> {
        let name = self.node(dataset)?.name.clone();
        match &mut self.node_mut(dataset)?.kind {
            NodeKind::Dataset { extent, data: DataBuf::F64(buf), .. } => {
                let end = offset
                    .checked_add(samples.len() as u64)
                    .ok_or_else(|| Error::store("hyperslab range overflow"))?;
                if end > *extent {
                    return Err(Error::Bounds {
                        dataset: name,
                        offset,
                        len: samples.len() as u64,
                        extent: *extent,
                    });
                }
                buf[offset as usize..end as usize].copy_from_slice(samples);
                Ok(())
            }
            _ => Err(Error::store(format!("`{name}` is not a float64 dataset"))),
        }
    }

    fn write_u16(&mut self, dataset: NodeId, values: &[u16]) -> Result<()> {
        let name = self.node(dataset)?.name.clone();
        match &mut self.node_mut(dataset)?.kind {
            NodeKind::Dataset { extent, data: DataBuf::U16(buf), .. } => {
                if values.len() as u64 != *extent {
                    return Err(Error::store(format!(
                        "uint16 write of {} values into `{name}` with extent {extent}",
                        values.len()
                    )));
                }
                buf.copy_from_slice(values);
                Ok(())
            }
            _ => Err(Error::store(format!("`{name}` is not a uint16 dataset"))),
        }
    }

    fn object_ref(&mut self, node: NodeId) -> Result<ObjectRef> {
        self.node(node)?;
        Ok(ObjectRef(node))
    }

    fn write_ref(&mut self, dataset: NodeId, value: ObjectRef) -> Result<()> {
        let name = self.node(dataset)?.name.clone();
        match &mut self.node_mut(dataset)?.kind {
            NodeKind::Dataset { data: DataBuf::Ref(buf), .. } => {
                let slot = buf
                    .first_mut()
                    .ok_or_else(|| Error::store(format!("reference dataset `{name}` is empty")))?;
                *slot = value.0;
                Ok(())
            }
            _ => Err(Error::store(format!("`{name}` is not a reference dataset"))),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(RESERVED_LEADING_BYTES))?;
        {
            let mut w = BufWriter::new(&mut self.file);
            w.write_all(DUMP_MAGIC)?;
            w.write_u16::<LittleEndian>(DUMP_VERSION)?;
            let nodes = &self.nodes;
            // Borrow dance: dump_node needs &self, the writer needs the file.
            let store_view = MemStoreView { nodes };
            store_view.dump_node(&mut w, 0)?;
            w.flush()?;
        }
        let end = self.file.stream_position()?;
        // Drop stale bytes from a previous, larger flush.
        self.file.set_len(end)?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Borrow-friendly view used while the file handle is mutably borrowed.
struct MemStoreView<'a> {
    nodes: &'a [Node],
}

impl MemStoreView<'_> {
    fn dump_node<W: Write>(&self, w: &mut W, id: NodeId) -> Result<()> {
        let node = self
            .nodes
            .get(id as usize)
            .ok_or_else(|| Error::store(format!("no node with id {id}")))?;
        w.write_u32::<LittleEndian>(node.name.len() as u32)?;
        w.write_all(node.name.as_bytes())?;
        w.write_u32::<LittleEndian>(node.attrs.len() as u32)?;
        for (name, value) in &node.attrs {
            w.write_u32::<LittleEndian>(name.len() as u32)?;
            w.write_all(name.as_bytes())?;
            match value {
                AttrValue::Text(s) => {
                    w.write_u8(0)?;
                    w.write_u32::<LittleEndian>(s.len() as u32)?;
                    w.write_all(s.as_bytes())?;
                }
                AttrValue::Int(i) => {
                    w.write_u8(1)?;
                    w.write_i64::<LittleEndian>(*i)?;
                }
            }
        }
        match &node.kind {
            NodeKind::Group { children } => {
                w.write_u8(0)?;
                w.write_u32::<LittleEndian>(children.len() as u32)?;
                for &(_, child) in children {
                    self.dump_node(w, child)?;
                }
            }
            NodeKind::Dataset { extent, chunk_len, data } => {
                w.write_u8(1)?;
                w.write_u64::<LittleEndian>(*extent)?;
                w.write_u64::<LittleEndian>(*chunk_len)?;
                match data {
                    DataBuf::F64(buf) => {
                        w.write_u8(0)?;
                        for &v in buf {
                            w.write_f64::<LittleEndian>(v)?;
                        }
                    }
                    DataBuf::U16(buf) => {
                        w.write_u8(1)?;
                        for &v in buf {
                            w.write_u16::<LittleEndian>(v)?;
                        }
                    }
                    DataBuf::Ref(buf) => {
                        w.write_u8(2)?;
                        for &v in buf {
                            w.write_u64::<LittleEndian>(v)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
