//! Dependency tracking
//!
//! One [`Tracker`] exists per store. It maps every reactive property (by a
//! [`DepId`] allocated here, never by name) to a dirty flag and the set of
//! regions that read it during their last render.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Identity of one reactive property, unique within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

/// A tree region (node) that can depend on reactive properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(pub usize);

/// The regions currently being rendered. Reads made with an empty set of
/// targets record nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Targets<'a>(&'a [Region]);

impl Targets<'static> {
    pub const NONE: Self = Targets(&[]);
}

impl<'a> Targets<'a> {
    pub fn new(regions: &'a [Region]) -> Self {
        Self(regions)
    }

    pub fn regions(&self) -> &'a [Region] {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DepRecord {
    /// Property name the record was allocated for (diagnostics only)
    pub label: String,
    pub changed: bool,
    pub dependents: IndexSet<Region>,
}

#[derive(Debug, Default)]
pub struct Tracker {
    records: IndexMap<DepId, DepRecord>,
    next_id: u64,
    /// Records allocated since the last [`Tracker::retain`]
    unswept: usize,
}

pub type SharedTracker = Rc<RefCell<Tracker>>;

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, label: &str) -> DepId {
        let id = DepId(self.next_id);
        self.next_id += 1;
        self.records.insert(
            id,
            DepRecord {
                label: label.to_string(),
                ..DepRecord::default()
            },
        );
        self.unswept += 1;
        id
    }

    pub fn unswept(&self) -> usize {
        self.unswept
    }

    /// Drop every record not in `live`. Returns how many were released.
    pub fn retain(&mut self, live: &HashSet<DepId>) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| live.contains(id));
        self.unswept = 0;
        before - self.records.len()
    }

    pub fn contains(&self, dep: DepId) -> bool {
        self.records.contains_key(&dep)
    }

    pub fn record(&self, dep: DepId) -> Option<&DepRecord> {
        self.records.get(&dep)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn depend(&mut self, dep: DepId, targets: Targets<'_>) {
        if let Some(record) = self.records.get_mut(&dep) {
            record.dependents.extend(targets.regions().iter().copied());
        }
    }

    pub fn mark_changed(&mut self, dep: DepId) {
        if let Some(record) = self.records.get_mut(&dep) {
            record.changed = true;
        }
    }

    pub fn any_changed(&self) -> bool {
        self.records.values().any(|r| r.changed)
    }

    /// Dependents of every changed record, each region once, in record
    /// order. Resets the dirty flags.
    pub fn collect_dirty(&mut self) -> Vec<Region> {
        let mut dirty = IndexSet::new();
        for record in self.records.values_mut() {
            if record.changed {
                dirty.extend(record.dependents.iter().copied());
                record.changed = false;
            }
        }
        dirty.into_iter().collect()
    }

    /// Drop a region from every dependent set
    pub fn forget(&mut self, region: Region) {
        for record in self.records.values_mut() {
            record.dependents.shift_remove(&region);
        }
    }
}
