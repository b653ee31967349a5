//! A circular ordered value space ([`FiniteGroup`]) and a mutable pointer into
//! it ([`GroupMember`]).
//!
//! `Months`/`Hours`/`Minutes`/`Seconds` are process-wide read-only groups in
//! the original design. Here they're lazily-initialized, immutable statics —
//! the same `once_cell`/`OnceLock` idiom the teacher uses for its global
//! metrics registries (`telemetry::metrics::internal::Registries`).

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An immutable, ordered, circular space of unique values.
///
/// Indexing is modular: index `len()` wraps back to `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteGroup<T> {
    values: Arc<Vec<T>>,
}

impl<T: PartialEq> FiniteGroup<T> {
    /// Builds a group from `values`. Every value must be unique.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or contains duplicates, since those would
    /// violate the group's core invariant and there is no sane empty-group
    /// semantics for modular indexing.
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "a finite group must not be empty");

        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert!(values[i] != values[j], "finite group values must be unique");
            }
        }

        Self {
            values: Arc::new(values),
        }
    }

    /// The number of distinct values in the group.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the group is empty. Always `false` — kept for the `len`/`is_empty`
    /// pair idiom clippy expects.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `index`, taken modulo the group's length.
    pub fn value_at(&self, index: i64) -> &T {
        &self.values[Self::normalize(index, self.values.len())]
    }

    /// The index of `value` in the group, if present.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    fn normalize(index: i64, len: usize) -> usize {
        let len = len as i64;
        (((index % len) + len) % len) as usize
    }
}

/// A mutable pointer into a [`FiniteGroup`].
///
/// Incrementing/decrementing past an end wraps around and invokes the
/// registered rollover/rollback handler, which reports how many full
/// revolutions were crossed (usually `1`, but can be larger for multi-step
/// increments).
pub struct GroupMember<T> {
    group: FiniteGroup<T>,
    index: usize,
    on_rollover: Option<Box<dyn FnMut(i64) + Send>>,
    on_rollback: Option<Box<dyn FnMut(i64) + Send>>,
}

impl<T: PartialEq + Clone> GroupMember<T> {
    /// Creates a member pointing at `value` within `group`.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a member of `group`.
    pub fn new(group: FiniteGroup<T>, value: &T) -> Self {
        let index = group
            .index_of(value)
            .expect("value must belong to the group");

        Self {
            group,
            index,
            on_rollover: None,
            on_rollback: None,
        }
    }

    /// Registers a handler invoked when incrementing crosses the end of the
    /// group (i.e. wraps from the last value back to the first).
    pub fn on_rollover(&mut self, handler: impl FnMut(i64) + Send + 'static) {
        self.on_rollover = Some(Box::new(handler));
    }

    /// Registers a handler invoked when decrementing crosses the start of the
    /// group (i.e. wraps from the first value back to the last).
    pub fn on_rollback(&mut self, handler: impl FnMut(i64) + Send + 'static) {
        self.on_rollback = Some(Box::new(handler));
    }

    /// The current value.
    pub fn value(&self) -> &T {
        self.group.value_at(self.index as i64)
    }

    /// The current index within the group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The group this member points into.
    pub fn group(&self) -> &FiniteGroup<T> {
        &self.group
    }

    /// Advances the pointer by `steps` (which may be negative, in which case
    /// this behaves like [`GroupMember::decrement`]).
    pub fn increment(&mut self, steps: i64) {
        if steps < 0 {
            return self.decrement(-steps);
        }

        let len = self.group.len() as i64;
        let new_index = self.index as i64 + steps;
        let revolutions = new_index.div_euclid(len);

        self.index = new_index.rem_euclid(len) as usize;

        if revolutions > 0 {
            if let Some(handler) = self.on_rollover.as_mut() {
                handler(revolutions);
            }
        }
    }

    /// Retreats the pointer by `steps` (which may be negative, in which case
    /// this behaves like [`GroupMember::increment`]).
    pub fn decrement(&mut self, steps: i64) {
        if steps < 0 {
            return self.increment(-steps);
        }

        let len = self.group.len() as i64;
        let new_index = self.index as i64 - steps;
        let revolutions = if new_index < 0 {
            (-new_index - 1) / len + 1
        } else {
            0
        };

        self.index = new_index.rem_euclid(len) as usize;

        if revolutions > 0 {
            if let Some(handler) = self.on_rollback.as_mut() {
                handler(revolutions);
            }
        }
    }

    /// Re-parents this member to point at the same index (clamped) within a
    /// new group, used by [`crate::temporal::date::ClockworkDate`] when a
    /// month transition changes the day-of-month group (28/29/30/31 days).
    pub fn reparent(&mut self, group: FiniteGroup<T>) {
        let clamped = self.index.min(group.len() - 1);
        self.group = group;
        self.index = clamped;
    }
}

impl<T: fmt::Debug> fmt::Debug for GroupMember<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupMember")
            .field("index", &self.index)
            .field("value", &self.group.values[self.index])
            .finish()
    }
}

impl<T: PartialEq + Clone> Clone for GroupMember<T> {
    fn clone(&self) -> Self {
        Self {
            group: self.group.clone(),
            index: self.index,
            on_rollover: None,
            on_rollback: None,
        }
    }
}

/// Comparison for two members of a (possibly different) group.
///
/// Per the spec's resolution of the corresponding Open Question: when `other`
/// belongs to the *same* group, comparison is by index; otherwise it falls
/// back to comparing values directly.
impl<T: PartialEq + Clone + PartialOrd> PartialEq for GroupMember<T> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl<T: PartialEq + Clone + PartialOrd> PartialOrd for GroupMember<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.group == other.group {
            self.index.partial_cmp(&other.index)
        } else {
            self.value().partial_cmp(other.value())
        }
    }
}

/// Compares a member against a raw value of the same type by value, per the
/// spec's resolution of the Open Question around `GroupMember.__lt__`.
impl<T: PartialEq + Clone + PartialOrd> PartialEq<T> for GroupMember<T> {
    fn eq(&self, other: &T) -> bool {
        self.value() == other
    }
}

impl<T: PartialEq + Clone + PartialOrd> PartialOrd<T> for GroupMember<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.value().partial_cmp(other)
    }
}

/// The 12 calendar months, `1..=12`.
pub static MONTHS: Lazy<FiniteGroup<u8>> = Lazy::new(|| FiniteGroup::new((1..=12).collect()));

/// Hours of a day, `0..=23`.
pub static HOURS: Lazy<FiniteGroup<u8>> = Lazy::new(|| FiniteGroup::new((0..=23).collect()));

/// Minutes of an hour, `0..=59`.
pub static MINUTES: Lazy<FiniteGroup<u8>> = Lazy::new(|| FiniteGroup::new((0..=59).collect()));

/// Seconds of a minute, `0..=59`.
pub static SECONDS: Lazy<FiniteGroup<u8>> = Lazy::new(|| FiniteGroup::new((0..=59).collect()));

/// Days of a month with `len` days, `1..=len`.
pub fn days_group(len: u8) -> FiniteGroup<u8> {
    FiniteGroup::new((1..=len).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(values: &[i32]) -> FiniteGroup<i32> {
        FiniteGroup::new(values.to_vec())
    }

    #[test]
    fn modular_indexing_wraps() {
        let g = group(&[0, 1, 2]);

        assert_eq!(*g.value_at(3), 0);
        assert_eq!(*g.value_at(-1), 2);
        assert_eq!(*g.value_at(4), 1);
    }

    #[test]
    fn increment_fires_rollover_once_per_revolution() {
        let g = group(&[0, 1, 2]);
        let mut member = GroupMember::new(g, &2);
        let rollovers = Arc::new(parking_lot::Mutex::new(0));
        let rollovers2 = rollovers.clone();

        member.on_rollover(move |n| *rollovers2.lock() += n);

        member.increment(1);
        assert_eq!(*member.value(), 0);
        assert_eq!(*rollovers.lock(), 1);

        member.increment(7); // 7 steps from index 0 over a group of 3: 2 revolutions
        assert_eq!(*rollovers.lock(), 1 + 2);
    }

    #[test]
    fn decrement_fires_rollback() {
        let g = group(&[0, 1, 2]);
        let mut member = GroupMember::new(g, &0);
        let rollbacks = Arc::new(parking_lot::Mutex::new(0));
        let rollbacks2 = rollbacks.clone();

        member.on_rollback(move |n| *rollbacks2.lock() += n);

        member.decrement(1);
        assert_eq!(*member.value(), 2);
        assert_eq!(*rollbacks.lock(), 1);
    }

    #[test]
    fn same_group_members_compare_by_index() {
        let g = group(&[10, 20, 30]);
        let a = GroupMember::new(g.clone(), &10);
        let b = GroupMember::new(g, &30);

        assert!(a < b);
    }

    #[test]
    fn different_group_members_compare_by_value() {
        let a = GroupMember::new(group(&[100, 1, 2]), &100);
        let b = GroupMember::new(group(&[5, 6, 7]), &5);

        assert!(a > b);
    }

    #[test]
    fn reparent_clamps_index() {
        let mut member = GroupMember::new(days_group(31), &31);

        member.reparent(days_group(28));
        assert_eq!(*member.value(), 28);
    }
}
