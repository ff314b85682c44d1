//! Per-component reactive store

use crate::tracker::{DepId, DepRecord, Region, SharedTracker, Tracker};
use crate::value::{collect_live, Object, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

/// A reactive data object together with its private dependency table
#[derive(Clone)]
pub struct Store {
    tracker: SharedTracker,
    data: Object,
}

impl Store {
    /// Make `object` reactive. A plain object is adopted in place; an object
    /// that already belongs to another store is deep-copied first.
    pub fn new(object: Object) -> Self {
        let tracker: SharedTracker = Rc::new(RefCell::new(Tracker::new()));
        let data = object.adopt_into(&tracker);
        debug!(records = tracker.borrow().len(), "Created reactive store");
        Self { tracker, data }
    }

    pub fn data(&self) -> &Object {
        &self.data
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    pub fn any_changed(&self) -> bool {
        self.tracker.borrow().any_changed()
    }

    pub fn collect_dirty(&self) -> Vec<Region> {
        self.tracker.borrow_mut().collect_dirty()
    }

    pub fn forget(&self, region: Region) {
        self.tracker.borrow_mut().forget(region);
    }

    pub fn forget_all(&self, regions: impl IntoIterator<Item = Region>) {
        let mut tracker = self.tracker.borrow_mut();
        for region in regions {
            tracker.forget(region);
        }
    }

    /// Record of `key` on `object`, provided the object belongs to this store
    fn record_of(&self, object: &Object, key: &str) -> Option<DepRecord> {
        let owner = object.owner()?;
        if !Rc::ptr_eq(&owner, &self.tracker) {
            return None;
        }
        let dep: DepId = object.dep_of(key)?;
        self.tracker.borrow().record(dep).cloned()
    }

    pub fn dependents(&self, object: &Object, key: &str) -> Vec<Region> {
        self.record_of(object, key)
            .map(|record| record.dependents.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn has_changed(&self, object: &Object, key: &str) -> bool {
        self.record_of(object, key).is_some_and(|record| record.changed)
    }

    /// Number of dependency records in this store
    pub fn records(&self) -> usize {
        self.tracker.borrow().len()
    }

    /// Records allocated since the last sweep
    pub fn unswept(&self) -> usize {
        self.tracker.borrow().unswept()
    }

    /// Release the records of every value no longer reachable from the data
    /// object. A released value that is written back into the store gets
    /// fresh records. Returns how many records were released.
    pub fn sweep(&self) -> usize {
        let mut live = HashSet::new();
        let root = Value::Object(self.data.clone());
        collect_live(&root, &self.tracker, &mut live, &mut HashSet::new());
        let released = self.tracker.borrow_mut().retain(&live);
        if released > 0 {
            debug!(released, records = live.len(), "Swept unreachable records");
        }
        released
    }
}

/// Shorthand for [`Store::new`]
pub fn make_reactive(object: Object) -> Store {
    Store::new(object)
}
