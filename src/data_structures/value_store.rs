use crate::graph::Value;
use num_integer::div_ceil;
use unwrap::unwrap;

/// Returns the index and mask necessary to access the bit at `index` in a ```&[u64]```.
///
/// # Example
///
/// ```
/// # use rtlsim::data_structures::word_mask_64;
/// let word_slice = [0u64, 1u64];
/// let bit_index = 64;
///
/// let (word_index, mask) = word_mask_64(bit_index);
/// let bit_set = (word_slice[word_index] & mask) != 0;
///
/// assert_eq!(bit_set, true);
/// ```
#[inline(always)]
pub fn word_mask_64(index: usize) -> (usize, u64) {
    let word = index / 64;
    let mask = 1 << (index % 64);
    (word, mask)
}

/// Data structure that represents a fixed size (at runtime) array of tri-state [Value]s packed in bit planes,
/// [ValueStore] also keeps track of which slots have been [set](ValueStore::set).
///
/// A slot that has never been set reads as [Value::Unknown].
///
/// # Example
/// ```
/// # use rtlsim::{data_structures::ValueStore, Value};
/// let mut s = ValueStore::new(2);
///
/// assert_eq!(s.capacity(), 64);
/// assert_eq!(s.get(1), Value::Unknown);
/// assert_eq!(s.get_if_resolved(1), None);
///
/// s.set(1, Value::One);
/// assert_eq!(s.get(1), Value::One);
/// assert_eq!(s.get_if_resolved(1), Some(Value::One));
///
/// s.set(1, Value::Unknown);
/// assert_eq!(s.get_if_resolved(1), Some(Value::Unknown));
/// ```
///
/// # Panics
///
/// Panics if you try to read or write to an index >= [ValueStore::capacity()]
///
/// ```should_panic
/// # use rtlsim::data_structures::ValueStore;
/// let s = ValueStore::new(2);
///
/// s.get(64);
/// ```
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ValueStore {
    len: usize,
    // Bit set means One, only meaningful where `known` is set.
    states: Vec<u64>,
    known: Vec<u64>,
    resolved: Vec<u64>,
}

impl ValueStore {
    /// Returns a new [ValueStore] with `n` slots all of which are [Value::Unknown] and unresolved.
    pub fn new(n: usize) -> ValueStore {
        let words = div_ceil(n, 64);
        ValueStore {
            len: n,
            states: vec![0; words],
            known: vec![0; words],
            resolved: vec![0; words],
        }
    }

    /// Returns true if the bit at `index` is 1 in vector `v`.
    ///
    /// See [word_mask_64] for details.
    #[inline(always)]
    fn get_bit_from_vec(v: &[u64], index: usize) -> bool {
        let (word_index, mask) = word_mask_64(index);
        let word = unwrap!(
            v.get(word_index),
            "Tried to access index out of bounds:{}, size:{}",
            index,
            v.len() * 64,
        );

        word & mask != 0
    }

    /// Sets the bit at `index` in vector `v` to `value`.
    #[inline(always)]
    fn set_bit_in_vec(v: &mut [u64], index: usize, value: bool) {
        let (word_index, mask) = word_mask_64(index);
        let size = v.len() * 64;
        let word = unwrap!(
            v.get_mut(word_index),
            "Tried to write index out of bounds:{}, size:{}",
            index,
            size,
        );
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [ValueStore::capacity()]
    pub fn get(&self, index: usize) -> Value {
        if !Self::get_bit_from_vec(&self.known, index) {
            return Value::Unknown;
        }
        Value::from(Self::get_bit_from_vec(&self.states, index))
    }

    /// Returns true if the slot at `index` has been [set](ValueStore::set).
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [ValueStore::capacity()]
    pub fn is_resolved(&self, index: usize) -> bool {
        Self::get_bit_from_vec(&self.resolved, index)
    }

    /// Returns the value at `index`.
    /// Returns None if the slot has not been [set](ValueStore::set).
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [ValueStore::capacity()]
    pub fn get_if_resolved(&self, index: usize) -> Option<Value> {
        if self.is_resolved(index) {
            Some(self.get(index))
        } else {
            None
        }
    }

    /// Sets the slot at `index` to `value` and keeps track that it has been resolved.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [ValueStore::capacity()]
    pub fn set(&mut self, index: usize, value: Value) {
        let bit = value.to_bool();
        Self::set_bit_in_vec(&mut self.known, index, bit.is_some());
        Self::set_bit_in_vec(&mut self.states, index, bit.unwrap_or(false));
        Self::set_bit_in_vec(&mut self.resolved, index, true);
    }

    /// Returns the number of slots requested at construction.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots actually allocated, always a multiple of 64.
    pub fn capacity(&self) -> usize {
        self.states.len() * 64
    }

    /// Iterates over the first [len](ValueStore::len) values.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::*;

    #[test]
    fn test_get_set() {
        for i in 2..100 {
            let mut store = ValueStore::new(100);
            assert_eq!(store.get(i), Unknown);
            assert_eq!(store.is_resolved(i), false);

            for v in &[One, Zero, Unknown, One] {
                store.set(i, *v);
                assert_eq!(store.get(i), *v, "index: {}", i);
                assert_eq!(store.is_resolved(i), true, "index: {}", i);
            }
            assert_eq!(store.get(i - 1), Unknown);
            assert_eq!(store.is_resolved(i + 1), false);
        }
    }

    #[test]
    fn test_len() {
        assert_eq!(ValueStore::new(2).capacity(), 64);
        assert_eq!(ValueStore::new(64).capacity(), 64);
        assert_eq!(ValueStore::new(65).capacity(), 128);
        assert_eq!(ValueStore::new(65).len(), 65);
        assert!(ValueStore::new(0).is_empty());
    }

    #[test]
    fn test_iter() {
        let mut store = ValueStore::new(3);
        store.set(0, One);
        store.set(2, Zero);

        assert_eq!(store.iter().collect::<Vec<_>>(), vec![One, Unknown, Zero]);
    }

    #[test]
    #[should_panic(expected = "Tried to write index out of bounds:65, size:64")]
    fn test_set_out_of_bounds_panics() {
        let mut store = ValueStore::new(1);
        store.set(65, One);
    }
}
