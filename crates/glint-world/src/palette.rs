use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Returned by id lookups when a value has no id.
pub const INVALID_ID: i32 = -1;

/// A bijection between dense ids `[0, size)` and values.
pub trait Palette<T> {
    /// Returns the id of `value`, appending it if the palette allows assignment.
    /// Palettes that cannot grow return [`INVALID_ID`] for unknown values.
    fn get_id_or_assign(&mut self, value: &T) -> i32;

    fn get_id(&self, value: &T) -> i32;

    fn get(&self, id: i32) -> Option<&T>;

    fn size(&self) -> usize;
}

/// Palette local to one section. Ids are handed out in insertion order and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPalette<T: Eq + Hash> {
    values: Vec<T>,
    ids: HashMap<T, i32>,
}

impl<T: Clone + Eq + Hash> LocalPalette<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Rebuilds a palette from its ordered entries. Duplicates keep their first id.
    pub fn from_entries(entries: Vec<T>) -> Self {
        let mut palette = Self::new();
        for entry in &entries {
            palette.get_id_or_assign(entry);
        }
        palette
    }

    pub fn entries(&self) -> &[T] {
        &self.values
    }
}

impl<T: Clone + Eq + Hash> Default for LocalPalette<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> Palette<T> for LocalPalette<T> {
    fn get_id_or_assign(&mut self, value: &T) -> i32 {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        let id = self.values.len() as i32;
        self.values.push(value.clone());
        self.ids.insert(value.clone(), id);
        id
    }

    fn get_id(&self, value: &T) -> i32 {
        self.ids.get(value).copied().unwrap_or(INVALID_ID)
    }

    fn get(&self, id: i32) -> Option<&T> {
        if id < 0 {
            return None;
        }
        self.values.get(id as usize)
    }

    fn size(&self) -> usize {
        self.values.len()
    }
}

/// The shared, immutable direct-id palette. Built once at startup.
#[derive(Debug, PartialEq, Eq)]
pub struct GlobalPalette<T: Eq + Hash> {
    inner: LocalPalette<T>,
}

impl<T: Clone + Eq + Hash> GlobalPalette<T> {
    pub fn new(values: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalPalette::from_entries(values),
        })
    }

    /// The global palette is immutable and shared, so copying hands out the same instance.
    pub fn copy(self: &Arc<Self>) -> Arc<Self> {
        Arc::clone(self)
    }
}

impl<T: Clone + Eq + Hash> Palette<T> for GlobalPalette<T> {
    fn get_id_or_assign(&mut self, value: &T) -> i32 {
        self.get_id(value)
    }

    fn get_id(&self, value: &T) -> i32 {
        self.inner.get_id(value)
    }

    fn get(&self, id: i32) -> Option<&T> {
        self.inner.get(id)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}
