//! Segment registry: id lookup per namespace, built once

use std::collections::HashMap;

use crate::core::{Error, Result};
use super::segment::{Namespace, Segment, SegmentDef};

/// Segments of one namespace, keyed by id.
///
/// The key set is fixed at construction. Segments keep their authored order
/// for iteration.
#[derive(Debug)]
pub struct NamespaceTable {
    namespace: Namespace,
    segments: Vec<Segment>,
    index: HashMap<String, usize>,
}

impl NamespaceTable {
    /// Build a table from definitions. Duplicate ids are rejected.
    pub fn build(namespace: Namespace, defs: Vec<SegmentDef>) -> Result<Self> {
        let mut segments = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());

        for def in defs {
            if index.contains_key(&def.id) {
                return Err(Error::DuplicateSegment { namespace, id: def.id });
            }
            index.insert(def.id.clone(), segments.len());
            segments.push(Segment::new(def, namespace));
        }

        Ok(Self {
            namespace,
            segments,
            index,
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn get(&self, id: &str) -> Option<&Segment> {
        self.index.get(id).map(|&i| &self.segments[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Segment> {
        self.index.get(id).map(|&i| &mut self.segments[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.segments.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Both namespace tables
#[derive(Debug)]
pub struct SegmentRegistry {
    core: NamespaceTable,
    memory: NamespaceTable,
}

impl SegmentRegistry {
    /// Register the core and memory segment lists
    pub fn register(core: Vec<SegmentDef>, memory: Vec<SegmentDef>) -> Result<Self> {
        let core = NamespaceTable::build(Namespace::Core, core)?;
        let memory = NamespaceTable::build(Namespace::Memory, memory)?;
        log::debug!(
            "Registered {} core and {} memory segments",
            core.len(),
            memory.len()
        );
        Ok(Self { core, memory })
    }

    /// Empty registry
    pub fn empty() -> Self {
        Self {
            core: NamespaceTable {
                namespace: Namespace::Core,
                segments: Vec::new(),
                index: HashMap::new(),
            },
            memory: NamespaceTable {
                namespace: Namespace::Memory,
                segments: Vec::new(),
                index: HashMap::new(),
            },
        }
    }

    pub fn table(&self, namespace: Namespace) -> &NamespaceTable {
        match namespace {
            Namespace::Core => &self.core,
            Namespace::Memory => &self.memory,
        }
    }

    pub fn table_mut(&mut self, namespace: Namespace) -> &mut NamespaceTable {
        match namespace {
            Namespace::Core => &mut self.core,
            Namespace::Memory => &mut self.memory,
        }
    }

    /// Look up a segment. Callers treat `None` as "skip".
    pub fn lookup(&self, namespace: Namespace, id: &str) -> Option<&Segment> {
        self.table(namespace).get(id)
    }

    pub fn lookup_mut(&mut self, namespace: Namespace, id: &str) -> Option<&mut Segment> {
        self.table_mut(namespace).get_mut(id)
    }

    /// All segments across both namespaces, core first
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.core.iter().chain(self.memory.iter())
    }

    /// Total segment count
    pub fn len(&self) -> usize {
        self.core.len() + self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
