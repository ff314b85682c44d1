//! Runtime values
//!
//! Objects and arrays are shared handles, so the same object can be reachable
//! from the component data and from an iteration context at once. A value
//! becomes reactive when a [`Store`](crate::Store) adopts it: every string
//! keyed property then carries a dependency record in that store's tracker.

use crate::tracker::{DepId, SharedTracker, Targets};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Deep copy that belongs to no store
    pub fn detached_copy(&self) -> Value {
        match self {
            Value::Object(o) => Value::Object(o.detached_copy()),
            Value::Array(a) => Value::Array(a.detached_copy()),
            scalar => scalar.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Json::Number)
                        .unwrap_or(Json::Null)
                }
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Array(a) => Json::Array(a.to_vec().iter().map(Value::to_json).collect()),
            Value::Object(o) => Json::Object(
                o.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(a) => {
                for (i, item) in a.to_vec().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        // also normalizes -0 to 0
        format!("{}", n as i128)
    } else {
        n.to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from_values(items))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::from(items.into_iter().map(Value::from).collect::<Vec<_>>()),
            Json::Object(map) => Value::Object(Object::from_pairs(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

/// Properties that start with a digit are array-index-like and never get
/// their own dependency record
pub(crate) fn is_tracked_key(key: &str) -> bool {
    !key.starts_with(|c: char| c.is_ascii_digit())
}

pub(crate) fn adopt(value: Value, tracker: &SharedTracker, dep: Option<DepId>) -> Value {
    match value {
        Value::Object(o) => Value::Object(o.adopt_into(tracker)),
        Value::Array(a) => Value::Array(a.adopt_into(tracker, dep)),
        scalar => scalar,
    }
}

/// Add every record reachable from `value` that belongs to `tracker` to
/// `live`. Values owned by other stores are not entered.
pub(crate) fn collect_live(
    value: &Value,
    tracker: &SharedTracker,
    live: &mut HashSet<DepId>,
    seen: &mut HashSet<usize>,
) {
    match value {
        Value::Object(o) => o.collect_live(tracker, live, seen),
        Value::Array(a) => a.collect_live(tracker, live, seen),
        _ => {}
    }
}

fn owned_by(owner: Option<SharedTracker>, tracker: &SharedTracker) -> bool {
    owner.is_some_and(|owner| Rc::ptr_eq(&owner, tracker))
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    dep: Option<DepId>,
}

#[derive(Default)]
struct ObjectCell {
    props: RefCell<IndexMap<String, Slot>>,
    owner: RefCell<Option<SharedTracker>>,
}

/// Shared, ordered property map
#[derive(Clone, Default)]
pub struct Object(Rc<ObjectCell>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Self::new();
        {
            let mut props = object.0.props.borrow_mut();
            for (key, value) in pairs {
                props.insert(
                    key.into(),
                    Slot {
                        value: value.into(),
                        dep: None,
                    },
                );
            }
        }
        object
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_reactive(&self) -> bool {
        self.0.owner.borrow().is_some()
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.props.borrow().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().cloned().collect()
    }

    /// Snapshot of all properties, read without tracking
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .props
            .borrow()
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    /// Dependency record of a property, if it is reactive
    pub fn dep_of(&self, key: &str) -> Option<DepId> {
        self.0.props.borrow().get(key).and_then(|slot| slot.dep)
    }

    pub(crate) fn owner(&self) -> Option<SharedTracker> {
        self.0.owner.borrow().clone()
    }

    /// Read a property. When the property is reactive, every region in
    /// `targets` becomes one of its dependents.
    pub fn get(&self, key: &str, targets: Targets<'_>) -> Value {
        let (value, dep) = match self.0.props.borrow().get(key) {
            Some(slot) => (slot.value.clone(), slot.dep),
            None => return Value::Undefined,
        };
        if let (Some(dep), false) = (dep, targets.is_empty()) {
            if let Some(tracker) = self.owner() {
                tracker.borrow_mut().depend(dep, targets);
            }
        }
        value
    }

    /// Untracked read
    pub fn peek(&self, key: &str) -> Value {
        self.get(key, Targets::NONE)
    }

    /// Write a property. Returns whether the stored value changed.
    ///
    /// On a reactive object a differing value is adopted into the owning
    /// store (nested objects and arrays become reactive too) and the
    /// property's record is marked changed. Writing an equal value is a no-op.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        let Some(tracker) = self.owner() else {
            self.0.props.borrow_mut().insert(key, Slot { value, dep: None });
            return true;
        };

        let existing = self
            .0
            .props
            .borrow()
            .get(&key)
            .map(|slot| (slot.value.clone(), slot.dep));

        match existing {
            Some((old, dep)) => {
                if old == value {
                    return false;
                }
                let value = adopt(value, &tracker, dep);
                if let Some(slot) = self.0.props.borrow_mut().get_mut(&key) {
                    slot.value = value;
                }
                if let Some(dep) = dep {
                    trace!(key = %key, "Reactive property changed");
                    tracker.borrow_mut().mark_changed(dep);
                }
                true
            }
            None => {
                let dep = is_tracked_key(&key).then(|| tracker.borrow_mut().allocate(&key));
                let value = adopt(value, &tracker, dep);
                self.0.props.borrow_mut().insert(key, Slot { value, dep });
                true
            }
        }
    }

    pub fn detached_copy(&self) -> Object {
        Object::from_pairs(
            self.entries()
                .into_iter()
                .map(|(k, v)| (k, v.detached_copy())),
        )
    }

    /// Bind this object (and everything reachable from it) to `tracker`.
    /// Objects owned by another store are copied first so that dependency
    /// identities never cross stores.
    pub(crate) fn adopt_into(&self, tracker: &SharedTracker) -> Object {
        match self.owner() {
            Some(owner) if Rc::ptr_eq(&owner, tracker) => {
                self.revive(tracker, &mut HashSet::new());
                return self.clone();
            }
            Some(_) => return self.detached_copy().adopt_into(tracker),
            None => {}
        }
        *self.0.owner.borrow_mut() = Some(tracker.clone());

        for key in self.keys() {
            let Some(value) = self.0.props.borrow().get(&key).map(|s| s.value.clone()) else {
                continue;
            };
            let dep = is_tracked_key(&key).then(|| tracker.borrow_mut().allocate(&key));
            let value = adopt(value, tracker, dep);
            if let Some(slot) = self.0.props.borrow_mut().get_mut(&key) {
                slot.value = value;
                slot.dep = dep;
            }
        }
        self.clone()
    }

    /// Re-register records released by a sweep while this object was out of
    /// reach of its store
    fn revive(&self, tracker: &SharedTracker, seen: &mut HashSet<usize>) {
        if !seen.insert(Rc::as_ptr(&self.0) as usize) {
            return;
        }
        let stale: Vec<String> = {
            let tracker = tracker.borrow();
            self.0
                .props
                .borrow()
                .iter()
                .filter(|(_, slot)| slot.dep.is_some_and(|dep| !tracker.contains(dep)))
                .map(|(key, _)| key.clone())
                .collect()
        };
        if stale.is_empty() {
            return;
        }
        trace!(records = stale.len(), "Reviving swept records");
        for key in stale {
            let dep = tracker.borrow_mut().allocate(&key);
            if let Some(slot) = self.0.props.borrow_mut().get_mut(&key) {
                slot.dep = Some(dep);
            }
        }
        let slots: Vec<(Option<DepId>, Value)> = self
            .0
            .props
            .borrow()
            .values()
            .map(|slot| (slot.dep, slot.value.clone()))
            .collect();
        for (dep, value) in slots {
            match value {
                Value::Object(o) if owned_by(o.owner(), tracker) => o.revive(tracker, seen),
                Value::Array(a) if owned_by(a.owner(), tracker) => {
                    if dep.is_some() {
                        *a.0.dep.borrow_mut() = dep;
                    }
                    a.revive(tracker, seen)
                }
                _ => {}
            }
        }
    }

    fn collect_live(
        &self,
        tracker: &SharedTracker,
        live: &mut HashSet<DepId>,
        seen: &mut HashSet<usize>,
    ) {
        if !owned_by(self.owner(), tracker) || !seen.insert(Rc::as_ptr(&self.0) as usize) {
            return;
        }
        let slots: Vec<(Option<DepId>, Value)> = self
            .0
            .props
            .borrow()
            .values()
            .map(|slot| (slot.dep, slot.value.clone()))
            .collect();
        for (dep, value) in slots {
            live.extend(dep);
            collect_live(&value, tracker, live, seen);
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.0.props.borrow();
        let b = other.0.props.borrow();
        a.len() == b.len()
            && a.iter()
                .all(|(k, slot)| b.get(k).is_some_and(|o| o.value == slot.value))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ArrayCell {
    items: RefCell<Vec<Value>>,
    owner: RefCell<Option<SharedTracker>>,
    /// Record of the property holding this array; mutations dirty it
    dep: RefCell<Option<DepId>>,
}

/// Shared array
#[derive(Clone, Default)]
pub struct Array(Rc<ArrayCell>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        let array = Self::new();
        *array.0.items.borrow_mut() = items;
        array
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Index reads are never tracked on their own; only the property that
    /// holds the array is
    pub fn get(&self, index: usize) -> Value {
        self.0
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Iterate over a snapshot of the items
    pub fn iter(&self) -> std::vec::IntoIter<Value> {
        self.to_vec().into_iter()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let value = self.incoming(value.into());
        self.0.items.borrow_mut().push(value);
        self.mark_owner();
    }

    pub fn pop(&self) -> Value {
        let value = self.0.items.borrow_mut().pop();
        self.mark_owner();
        value.unwrap_or(Value::Undefined)
    }

    pub fn shift(&self) -> Value {
        let value = {
            let mut items = self.0.items.borrow_mut();
            (!items.is_empty()).then(|| items.remove(0))
        };
        self.mark_owner();
        value.unwrap_or(Value::Undefined)
    }

    pub fn unshift(&self, value: impl Into<Value>) {
        let value = self.incoming(value.into());
        self.0.items.borrow_mut().insert(0, value);
        self.mark_owner();
    }

    /// Index write. Coarse: dirties every dependent of the whole array.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = self.incoming(value.into());
        {
            let mut items = self.0.items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
        }
        self.mark_owner();
    }

    fn incoming(&self, value: Value) -> Value {
        match self.0.owner.borrow().clone() {
            Some(tracker) => adopt(value, &tracker, None),
            None => value,
        }
    }

    fn mark_owner(&self) {
        let owner = self.0.owner.borrow().clone();
        let dep = *self.0.dep.borrow();
        if let (Some(tracker), Some(dep)) = (owner, dep) {
            tracker.borrow_mut().mark_changed(dep);
        }
    }

    pub fn detached_copy(&self) -> Array {
        Array::from_values(self.to_vec().iter().map(Value::detached_copy).collect())
    }

    pub(crate) fn adopt_into(&self, tracker: &SharedTracker, dep: Option<DepId>) -> Array {
        let owner = self.0.owner.borrow().clone();
        match owner {
            Some(owner) if Rc::ptr_eq(&owner, tracker) => {
                if dep.is_some() {
                    *self.0.dep.borrow_mut() = dep;
                }
                self.revive(tracker, &mut HashSet::new());
                return self.clone();
            }
            Some(_) => return self.detached_copy().adopt_into(tracker, dep),
            None => {}
        }
        *self.0.owner.borrow_mut() = Some(tracker.clone());
        *self.0.dep.borrow_mut() = dep;

        let items = self.to_vec();
        let adopted: Vec<Value> = items
            .into_iter()
            .map(|item| adopt(item, tracker, None))
            .collect();
        *self.0.items.borrow_mut() = adopted;
        self.clone()
    }

    fn owner(&self) -> Option<SharedTracker> {
        self.0.owner.borrow().clone()
    }

    fn revive(&self, tracker: &SharedTracker, seen: &mut HashSet<usize>) {
        if !seen.insert(Rc::as_ptr(&self.0) as usize) {
            return;
        }
        for item in self.to_vec() {
            match item {
                Value::Object(o) if owned_by(o.owner(), tracker) => o.revive(tracker, seen),
                Value::Array(a) if owned_by(a.owner(), tracker) => a.revive(tracker, seen),
                _ => {}
            }
        }
    }

    fn collect_live(
        &self,
        tracker: &SharedTracker,
        live: &mut HashSet<DepId>,
        seen: &mut HashSet<usize>,
    ) {
        if !owned_by(self.owner(), tracker) || !seen.insert(Rc::as_ptr(&self.0) as usize) {
            return;
        }
        live.extend(*self.0.dep.borrow());
        for item in self.to_vec() {
            collect_live(&item, tracker, live, seen);
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.items.borrow() == *other.0.items.borrow()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}
