//! Resident-object tables keyed by local id.
//!
//! Each [`IdTable`] is a separately chained hash table with `2^exp` buckets.
//! Keys are dense local ids, so a multiplicative hash on the golden ratio
//! spreads consecutive ids well. Chains keep insertion order: new keys are
//! appended at the tail and rehashing re-links each old bucket in order.
//!
//! The tables are the authoritative resident set. A miss means the element
//! does not exist locally; there is no disk fallback here.

use std::mem;

use tracing::{debug, warn};

use super::object::{ElementObject, IncidenceObject};
use crate::types::LocalId;

/// Odd 32-bit multiplier derived from the golden ratio.
pub const HASH_MULTIPLIER: u32 = 0x9E37_79B9;
/// Entries per bucket above which the table doubles.
pub const MAX_LOAD_FACTOR: f64 = 0.7;
/// Growth stops at `2^MAX_EXP` buckets.
pub const MAX_EXP: u32 = 31;
/// Buckets allocated when the caller does not ask for more.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Collision-chain node: key, value and the next node of the same bucket.
struct CacheEntry<V> {
    key: u32,
    value: V,
    next: Option<Box<CacheEntry<V>>>,
}

/// Hash table from local id to a resident value.
pub struct IdTable<V> {
    buckets: Vec<Option<Box<CacheEntry<V>>>>,
    exp: u32,
    entries: usize,
    growth_capped: bool,
}

fn exp_for_capacity(capacity: usize) -> u32 {
    let capacity = capacity.max(2);
    let exp = usize::BITS - (capacity - 1).leading_zeros();
    exp.clamp(1, MAX_EXP)
}

fn empty_buckets<V>(len: usize) -> Vec<Option<Box<CacheEntry<V>>>> {
    let mut buckets = Vec::with_capacity(len);
    buckets.resize_with(len, || None);
    buckets
}

impl<V> IdTable<V> {
    /// Table with at least `capacity` buckets (rounded up to a power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        let exp = exp_for_capacity(capacity);
        Self {
            buckets: empty_buckets(1usize << exp),
            exp,
            entries: 0,
            growth_capped: false,
        }
    }

    /// Number of buckets.
    pub fn table_size(&self) -> usize {
        self.buckets.len()
    }

    /// Current `log2(table_size)`.
    pub fn exp(&self) -> u32 {
        self.exp
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Returns true when nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    #[inline]
    fn bucket_of(&self, key: u32) -> usize {
        (key.wrapping_mul(HASH_MULTIPLIER) >> (32 - self.exp)) as usize
    }

    /// Stores `value` under `key`, appending to the end of the bucket chain.
    ///
    /// An existing key keeps its chain position and gets the new value; the
    /// previous value is returned.
    pub fn insert(&mut self, key: u32, value: V) -> Option<V> {
        let idx = self.bucket_of(key);
        let mut cursor = &mut self.buckets[idx];
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(mem::replace(&mut entry.value, value));
            }
            cursor = &mut entry.next;
        }
        *cursor = Some(Box::new(CacheEntry {
            key,
            value,
            next: None,
        }));
        self.entries += 1;
        if self.entries as f64 > self.buckets.len() as f64 * MAX_LOAD_FACTOR {
            self.grow();
        }
        None
    }

    /// Looks up `key`.
    pub fn get(&self, key: u32) -> Option<&V> {
        let mut cursor = self.buckets[self.bucket_of(key)].as_deref();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(&entry.value);
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    /// Looks up `key` for mutation.
    pub fn get_mut(&mut self, key: u32) -> Option<&mut V> {
        let idx = self.bucket_of(key);
        let mut cursor = self.buckets[idx].as_deref_mut();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(&mut entry.value);
            }
            cursor = entry.next.as_deref_mut();
        }
        None
    }

    /// Returns true if `key` is resident.
    pub fn contains(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    /// Splices `key` out of its chain and returns its value.
    pub fn remove(&mut self, key: u32) -> Option<V> {
        let idx = self.bucket_of(key);
        let mut cursor = &mut self.buckets[idx];
        loop {
            match cursor.as_deref() {
                None => return None,
                Some(entry) if entry.key == key => break,
                Some(_) => {}
            }
            cursor = &mut cursor.as_mut()?.next;
        }
        let mut removed = cursor.take()?;
        *cursor = removed.next.take();
        self.entries -= 1;
        Some(removed.value)
    }

    /// Doubles the bucket array and re-links every entry.
    ///
    /// Every entry of old bucket `i` lands in new bucket `2i` or `2i + 1`,
    /// so draining a bucket onto a stack and pushing the nodes back onto the
    /// chain heads keeps their relative order.
    fn grow(&mut self) {
        if self.exp >= MAX_EXP {
            if !self.growth_capped {
                self.growth_capped = true;
                warn!(
                    entries = self.entries,
                    buckets = self.buckets.len(),
                    "cache.grow.capped"
                );
            }
            return;
        }
        let new_exp = self.exp + 1;
        let old = mem::replace(&mut self.buckets, empty_buckets(1usize << new_exp));
        self.exp = new_exp;
        let mut stack = Vec::new();
        for bucket in old {
            let mut next = bucket;
            while let Some(mut entry) = next {
                next = entry.next.take();
                stack.push(entry);
            }
            while let Some(mut entry) = stack.pop() {
                let idx = self.bucket_of(entry.key);
                entry.next = self.buckets[idx].take();
                self.buckets[idx] = Some(entry);
            }
        }
        debug!(
            buckets = self.buckets.len(),
            entries = self.entries,
            "cache.grow"
        );
    }

    /// Iterates entries bucket by bucket, in chain order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: None,
        }
    }

    /// Keys in iteration order.
    pub fn keys(&self) -> Vec<u32> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// Applies `f` to every entry.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(u32, &mut V)) {
        for bucket in &mut self.buckets {
            let mut cursor = bucket.as_deref_mut();
            while let Some(entry) = cursor {
                f(entry.key, &mut entry.value);
                cursor = entry.next.as_deref_mut();
            }
        }
    }

    /// Drops every entry, keeping the current bucket count.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            // Unlink iteratively so long chains do not recurse on drop.
            let mut next = bucket.take();
            while let Some(mut entry) = next {
                next = entry.next.take();
            }
        }
        self.entries = 0;
    }
}

impl<V> Default for IdTable<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<V> Drop for IdTable<V> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Iterator over `(key, &value)` pairs of an [`IdTable`].
pub struct Iter<'a, V> {
    buckets: std::slice::Iter<'a, Option<Box<CacheEntry<V>>>>,
    chain: Option<&'a CacheEntry<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.chain {
                self.chain = entry.next.as_deref();
                return Some((entry.key, &entry.value));
            }
            self.chain = self.buckets.next()?.as_deref();
        }
    }
}

/// The three resident sets of one partial graph.
pub struct ObjectCache {
    vertices: IdTable<ElementObject>,
    edges: IdTable<ElementObject>,
    incidences: IdTable<IncidenceObject>,
}

impl ObjectCache {
    /// Cache whose tables start with `capacity` buckets each.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: IdTable::with_capacity(capacity),
            edges: IdTable::with_capacity(capacity),
            incidences: IdTable::with_capacity(capacity),
        }
    }

    /// Makes a vertex resident.
    pub fn store_vertex(&mut self, id: LocalId, vertex: ElementObject) -> Option<ElementObject> {
        self.vertices.insert(id.0, vertex)
    }

    /// Resident vertex.
    pub fn get_vertex(&self, id: LocalId) -> Option<&ElementObject> {
        self.vertices.get(id.0)
    }

    /// Resident vertex for mutation.
    pub fn get_vertex_mut(&mut self, id: LocalId) -> Option<&mut ElementObject> {
        self.vertices.get_mut(id.0)
    }

    /// Evicts a vertex.
    pub fn remove_vertex(&mut self, id: LocalId) -> Option<ElementObject> {
        self.vertices.remove(id.0)
    }

    /// Makes an edge resident.
    pub fn store_edge(&mut self, id: LocalId, edge: ElementObject) -> Option<ElementObject> {
        self.edges.insert(id.0, edge)
    }

    /// Resident edge.
    pub fn get_edge(&self, id: LocalId) -> Option<&ElementObject> {
        self.edges.get(id.0)
    }

    /// Resident edge for mutation.
    pub fn get_edge_mut(&mut self, id: LocalId) -> Option<&mut ElementObject> {
        self.edges.get_mut(id.0)
    }

    /// Evicts an edge.
    pub fn remove_edge(&mut self, id: LocalId) -> Option<ElementObject> {
        self.edges.remove(id.0)
    }

    /// Makes an incidence resident.
    pub fn store_incidence(
        &mut self,
        id: LocalId,
        incidence: IncidenceObject,
    ) -> Option<IncidenceObject> {
        self.incidences.insert(id.0, incidence)
    }

    /// Resident incidence.
    pub fn get_incidence(&self, id: LocalId) -> Option<&IncidenceObject> {
        self.incidences.get(id.0)
    }

    /// Resident incidence for mutation.
    pub fn get_incidence_mut(&mut self, id: LocalId) -> Option<&mut IncidenceObject> {
        self.incidences.get_mut(id.0)
    }

    /// Evicts an incidence.
    pub fn remove_incidence(&mut self, id: LocalId) -> Option<IncidenceObject> {
        self.incidences.remove(id.0)
    }

    /// Vertex table.
    pub fn vertices(&self) -> &IdTable<ElementObject> {
        &self.vertices
    }

    /// Edge table.
    pub fn edges(&self) -> &IdTable<ElementObject> {
        &self.edges
    }

    /// Incidence table.
    pub fn incidences(&self) -> &IdTable<IncidenceObject> {
        &self.incidences
    }

    pub(crate) fn tables_mut(
        &mut self,
    ) -> (
        &mut IdTable<ElementObject>,
        &mut IdTable<ElementObject>,
        &mut IdTable<IncidenceObject>,
    ) {
        (&mut self.vertices, &mut self.edges, &mut self.incidences)
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
