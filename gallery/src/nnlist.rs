use std::fmt;
use std::ops::Index;

/// One retained neighbor: an element and its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEntry<T> {
    pub element: T,
    pub distance: f32,
}

impl<T: fmt::Display> fmt::Display for NeighborEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.element, self.distance)
    }
}

/// Fixed-capacity list of the k closest elements seen so far, sorted by
/// ascending distance.
///
/// # Insertion policy
///
/// A candidate is accepted while the list has room, or when its distance is
/// strictly below [`NNList::max_distance`]. Accepted entries go before the
/// first entry of equal or greater distance (lower-bound insertion), so
/// among equal distances the latest insertion comes first. If the list
/// overflows, the single farthest entry is evicted. Rejected candidates
/// are dropped silently.
#[derive(Debug, Clone)]
pub struct NNList<T> {
    entries: Vec<NeighborEntry<T>>,
    capacity: usize,
    bound: Option<f32>,
}

impl<T> NNList<T> {
    /// Creates an empty list holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            bound: None,
        }
    }

    /// Creates a full list of `capacity` sentinel entries, each holding
    /// `element` at `distance`.
    ///
    /// Useful for scans that assume a full list from the start, e.g. with
    /// `f32::INFINITY` as the sentinel distance.
    pub fn filled(capacity: usize, element: T, distance: f32) -> Self
    where
        T: Clone,
    {
        let entries = vec![NeighborEntry { element, distance }; capacity];
        Self {
            entries,
            capacity,
            bound: None,
        }
    }

    /// Offers a candidate. Returns true if it was retained.
    ///
    /// NaN distances are never retained.
    pub fn insert(&mut self, element: T, distance: f32) -> bool {
        if self.capacity == 0 || distance.is_nan() {
            return false;
        }
        if self.entries.len() >= self.capacity && distance >= self.max_distance() {
            return false;
        }

        let pos = self.entries.partition_point(|e| e.distance < distance);
        self.entries.insert(pos, NeighborEntry { element, distance });
        if self.entries.len() > self.capacity {
            self.entries.pop();
        }
        true
    }

    /// Tightens the pruning bound to `distance` without storing an element.
    ///
    /// The bound only ever decreases; [`NNList::max_distance`] reports the
    /// smaller of the bound and the farthest retained entry.
    pub fn insert_distance_only(&mut self, distance: f32) {
        self.bound = Some(match self.bound {
            Some(b) => b.min(distance),
            None => distance,
        });
    }

    /// Pruning threshold: the distance of the farthest retained entry, or
    /// infinity when empty, lowered by any bound set through
    /// [`NNList::insert_distance_only`].
    pub fn max_distance(&self) -> f32 {
        let worst = self
            .entries
            .last()
            .map_or(f32::INFINITY, |e| e.distance);
        match self.bound {
            Some(b) => worst.min(b),
            None => worst,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&NeighborEntry<T>> {
        self.entries.get(index)
    }

    /// Entries in ascending distance order.
    pub fn iter(&self) -> std::slice::Iter<'_, NeighborEntry<T>> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[NeighborEntry<T>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<NeighborEntry<T>> {
        self.entries
    }
}

impl<T> Index<usize> for NNList<T> {
    type Output = NeighborEntry<T>;

    fn index(&self, index: usize) -> &NeighborEntry<T> {
        &self.entries[index]
    }
}

impl<T> IntoIterator for NNList<T> {
    type Item = NeighborEntry<T>;
    type IntoIter = std::vec::IntoIter<NeighborEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a NNList<T> {
    type Item = &'a NeighborEntry<T>;
    type IntoIter = std::slice::Iter<'a, NeighborEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: fmt::Display> fmt::Display for NNList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("]")
    }
}
