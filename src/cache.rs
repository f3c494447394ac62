//! Per-instance attribute cache.
//!
//! Every attribute of a driver owns one slot per channel (or a single slot for
//! instrument-wide attributes). A slot holds the last known value together
//! with a validity flag: valid slots short-circuit reads, invalid slots force
//! the next read to go to the instrument. There is no time-based expiry;
//! validity only changes through [`AttributeCache::set`] and the
//! invalidation calls.

use crate::value::Value;
use std::collections::HashMap;

/// Address of one or more cache slots of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A single slot: `Some(index)` for a channel, `None` for instrument scope.
    One(Option<usize>),
    /// Every slot of the attribute.
    All,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    valid: bool,
}

/// Cached attribute state keyed by attribute name and channel index.
#[derive(Debug, Clone, Default)]
pub struct AttributeCache {
    entries: HashMap<(String, Option<usize>), Entry>,
}

impl AttributeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an invalid slot holding `value` as its default.
    pub fn insert_default(&mut self, attribute: &str, index: Option<usize>, value: Value) {
        self.entries
            .insert((attribute.to_string(), index), Entry { value, valid: false });
    }

    /// Whether the slot holds a value read from or written to the instrument.
    pub fn is_valid(&self, attribute: &str, index: Option<usize>) -> bool {
        self.entry(attribute, index).is_some_and(|entry| entry.valid)
    }

    /// Current slot value, valid or not.
    pub fn get(&self, attribute: &str, index: Option<usize>) -> Option<&Value> {
        self.entry(attribute, index).map(|entry| &entry.value)
    }

    /// Store `value` and mark the slot valid.
    pub fn set(&mut self, attribute: &str, index: Option<usize>, value: Value) {
        self.entries
            .insert((attribute.to_string(), index), Entry { value, valid: true });
    }

    /// Mark one or all slots of `attribute` invalid. Values are kept.
    pub fn invalidate(&mut self, attribute: &str, slot: Slot) {
        match slot {
            Slot::One(index) => {
                if let Some(entry) = self.entries.get_mut(&(attribute.to_string(), index)) {
                    entry.valid = false;
                }
            }
            Slot::All => {
                for ((name, _), entry) in self.entries.iter_mut() {
                    if name == attribute {
                        entry.valid = false;
                    }
                }
            }
        }
    }

    /// Mark every slot invalid.
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.valid = false;
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, attribute: &str, index: Option<usize>) -> Option<&Entry> {
        self.entries.get(&(attribute.to_string(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slot_is_invalid() {
        let mut cache = AttributeCache::new();
        cache.insert_default("voltage_level", Some(0), Value::Float(0.0));
        assert!(!cache.is_valid("voltage_level", Some(0)));
        assert_eq!(cache.get("voltage_level", Some(0)), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_set_marks_valid() {
        let mut cache = AttributeCache::new();
        cache.set("output_enabled", Some(1), Value::Bool(true));
        assert!(cache.is_valid("output_enabled", Some(1)));
        assert!(!cache.is_valid("output_enabled", Some(0)));
    }

    #[test]
    fn test_invalidate_all_channels_of_one_attribute() {
        let mut cache = AttributeCache::new();
        for index in 0..3 {
            cache.set("output_enabled", Some(index), Value::Bool(true));
            cache.set("voltage_level", Some(index), Value::Float(1.0));
        }
        cache.invalidate("output_enabled", Slot::All);

        for index in 0..3 {
            assert!(!cache.is_valid("output_enabled", Some(index)));
            assert!(cache.is_valid("voltage_level", Some(index)));
        }
        // the value survives invalidation
        assert_eq!(cache.get("output_enabled", Some(2)), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_invalidate_single_slot() {
        let mut cache = AttributeCache::new();
        cache.set("voltage_level", Some(0), Value::Float(1.0));
        cache.set("voltage_level", Some(1), Value::Float(2.0));
        cache.invalidate("voltage_level", Slot::One(Some(1)));
        assert!(cache.is_valid("voltage_level", Some(0)));
        assert!(!cache.is_valid("voltage_level", Some(1)));
    }

    #[test]
    fn test_invalidate_everything() {
        let mut cache = AttributeCache::new();
        cache.set("tracking", None, Value::from("series"));
        cache.set("voltage_level", Some(0), Value::Float(1.0));
        cache.invalidate_all();
        assert!(!cache.is_valid("tracking", None));
        assert!(!cache.is_valid("voltage_level", Some(0)));
        assert_eq!(cache.len(), 2);
    }
}
