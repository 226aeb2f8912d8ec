use crate::api::{FunctionDescriptor, LATEST, VersionDescriptor};
use std::collections::VecDeque;

/// Keeps the newest `capacity` eligible versions of one function and evicts everything older.
///
/// Versions must be offered oldest first. The current version and [`LATEST`] are never admitted
/// and never evicted. Whatever is still held once the listing ends is retained; there is no
/// flush.
#[derive(Debug)]
pub struct RetentionWindow {
    capacity: usize,
    current_version: String,
    held: VecDeque<VersionDescriptor>,
}

impl RetentionWindow {
    pub fn new(capacity: usize, current_version: impl Into<String>) -> Self {
        Self {
            capacity,
            current_version: current_version.into(),
            held: VecDeque::new(),
        }
    }

    pub fn for_function(capacity: usize, function: &FunctionDescriptor) -> Self {
        Self::new(capacity, function.current_version.as_str())
    }

    pub fn is_protected(&self, version: &str) -> bool {
        version == LATEST || version == self.current_version
    }

    /// Offers the next version in listing order. Returns the version that should be deleted, if
    /// admitting this one pushed the oldest held version out.
    pub fn offer(&mut self, version: VersionDescriptor) -> Option<VersionDescriptor> {
        if self.is_protected(&version.version) {
            return None;
        }

        if self.capacity == 0 {
            return Some(version);
        }

        let evicted = if self.held.len() == self.capacity {
            self.held.pop_front()
        } else {
            None
        };
        self.held.push_back(version);

        debug_assert!(self.held.len() <= self.capacity);
        evicted
    }

    /// Versions currently held, oldest first.
    pub fn retained(&self) -> impl Iterator<Item = &VersionDescriptor> {
        self.held.iter()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::version;
    use rstest::rstest;

    fn labels<'a>(versions: impl IntoIterator<Item = &'a VersionDescriptor>) -> Vec<String> {
        versions.into_iter().map(|v| v.version.clone()).collect()
    }

    fn offer_all(window: &mut RetentionWindow, labels: &[&str]) -> Vec<VersionDescriptor> {
        labels
            .iter()
            .filter_map(|label| window.offer(version("f1", label, 1)))
            .collect()
    }

    #[rstest]
    #[case(0, 5)]
    #[case(1, 5)]
    #[case(2, 5)]
    #[case(4, 5)]
    #[case(5, 5)]
    #[case(7, 5)]
    #[case(3, 0)]
    fn test_evicts_exactly_the_oldest(#[case] capacity: usize, #[case] count: usize) {
        let all: Vec<String> = (1..=count).map(|n| n.to_string()).collect();
        let all_refs: Vec<&str> = all.iter().map(String::as_str).collect();
        let mut window = RetentionWindow::new(capacity, "current");

        let evicted = offer_all(&mut window, &all_refs);

        let expected_deleted = count.saturating_sub(capacity);
        assert_eq!(labels(&evicted), all[..expected_deleted].to_vec());
        assert_eq!(labels(window.retained()), all[expected_deleted..].to_vec());
        assert!(window.len() <= capacity);
    }

    #[test]
    fn test_capacity_zero_flags_every_eligible_version_in_order() {
        let mut window = RetentionWindow::new(0, "3");

        let evicted = offer_all(&mut window, &["$LATEST", "1", "2", "3", "4"]);

        assert_eq!(labels(&evicted), vec!["1", "2", "4"]);
        assert!(window.is_empty());
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    fn test_protected_versions_are_never_flagged(#[case] capacity: usize) {
        let mut window = RetentionWindow::new(capacity, "2");

        let evicted = offer_all(&mut window, &["2", "$LATEST", "1", "3", "4", "5", "2", "$LATEST"]);

        assert!(evicted.iter().all(|v| v.version != "2" && v.version != LATEST));
        assert!(window.retained().all(|v| !window.is_protected(&v.version)));
    }

    #[test]
    fn test_protected_versions_do_not_take_a_slot() {
        let mut window = RetentionWindow::new(2, "3");

        let evicted = offer_all(&mut window, &["$LATEST", "1", "2", "3"]);

        assert!(evicted.is_empty());
        assert_eq!(labels(window.retained()), vec!["1", "2"]);
    }

    #[test]
    fn test_offer_returns_evicted_descriptor_untouched() {
        let mut window = RetentionWindow::new(1, "9");
        let v1 = version("f1", "1", 10);

        assert!(window.offer(v1.clone()).is_none());
        assert_eq!(window.offer(version("f1", "2", 20)), Some(v1));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_unbounded_capacity_keeps_everything() {
        let mut window = RetentionWindow::new(usize::MAX, "9");

        let evicted = offer_all(&mut window, &["1", "2", "3", "$LATEST", "4"]);

        assert!(evicted.is_empty());
        assert_eq!(labels(window.retained()), vec!["1", "2", "3", "4"]);
    }
}
