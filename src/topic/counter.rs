//! # Subscription reference counts.
//!
//! Keyed by **normalized** pattern, so textually different observations that
//! normalize identically share one broker subscription.
//!
//! ## Rules
//! - `0 → 1` on increment: caller must subscribe on the broker
//! - `1 → 0` on decrement: caller must unsubscribe on the broker
//! - any other transition: no broker call
//! - entries are removed when they reach zero; decrementing an absent entry stays at zero
//! - [`increment_with`](SubscriptionCounter::increment_with) and
//!   [`decrement_with`](SubscriptionCounter::decrement_with) run their closure under the
//!   counter lock, so the broker call it queues is ordered with the transition it follows

use std::collections::HashMap;

use parking_lot::Mutex;

/// Normalized pattern → number of attached observers.
#[derive(Debug, Default)]
pub struct SubscriptionCounter {
    counts: Mutex<HashMap<String, usize>>,
}

impl SubscriptionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `pattern` and returns the new value.
    pub fn increment(&self, pattern: &str) -> usize {
        self.increment_with(pattern, |count| count)
    }

    /// Decrements the count for `pattern` and returns the new value (never below zero).
    pub fn decrement(&self, pattern: &str) -> usize {
        self.decrement_with(pattern, |count| count)
    }

    /// Increments the count and hands the new value to `f` before releasing the lock.
    ///
    /// `f` must not touch this counter.
    pub fn increment_with<R>(&self, pattern: &str, f: impl FnOnce(usize) -> R) -> R {
        let mut counts = self.counts.lock();
        let count = counts.entry(pattern.to_string()).or_insert(0);
        *count += 1;
        f(*count)
    }

    /// Decrements the count and hands the new value to `f` before releasing the lock.
    ///
    /// `f` must not touch this counter.
    pub fn decrement_with<R>(&self, pattern: &str, f: impl FnOnce(usize) -> R) -> R {
        let mut counts = self.counts.lock();
        let count = match counts.get_mut(pattern) {
            Some(count) if *count > 1 => {
                *count -= 1;
                *count
            }
            Some(_) => {
                counts.remove(pattern);
                0
            }
            None => 0,
        };
        f(count)
    }

    /// Current count for `pattern`.
    pub fn get(&self, pattern: &str) -> usize {
        self.counts.lock().get(pattern).copied().unwrap_or(0)
    }

    /// Number of patterns with at least one observer.
    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }

    /// Drops every entry.
    pub fn destroy(&self) {
        self.counts.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let c = SubscriptionCounter::new();
        assert_eq!(c.increment("a/*"), 1);
        assert_eq!(c.increment("a/*"), 2);
        assert_eq!(c.increment("b"), 1);
        assert_eq!(c.len(), 2);

        assert_eq!(c.decrement("a/*"), 1);
        assert_eq!(c.decrement("a/*"), 0);
        assert_eq!(c.get("a/*"), 0);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_decrement_never_goes_negative() {
        let c = SubscriptionCounter::new();
        assert_eq!(c.decrement("missing"), 0);
        assert_eq!(c.increment("missing"), 1);
    }

    #[test]
    fn test_destroy_clears_everything() {
        let c = SubscriptionCounter::new();
        c.increment("a");
        c.increment("b");
        c.destroy();
        assert!(c.is_empty());
        assert_eq!(c.increment("a"), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let c = std::sync::Arc::new(SubscriptionCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        c.increment("t");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.get("t"), 8000);
    }

    #[test]
    fn test_transition_side_effects_keep_transition_order() {
        let c = std::sync::Arc::new(SubscriptionCounter::new());
        let calls = std::sync::Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (c, calls) = (c.clone(), calls.clone());
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        c.increment_with("t", |n| {
                            if n == 1 {
                                calls.lock().push("subscribe");
                            }
                        });
                        c.decrement_with("t", |n| {
                            if n == 0 {
                                calls.lock().push("unsubscribe");
                            }
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let calls = calls.lock();
        assert!(!calls.is_empty());
        assert_eq!(calls.len() % 2, 0);
        for pair in calls.chunks(2) {
            assert_eq!(pair, ["subscribe", "unsubscribe"]);
        }
        assert_eq!(c.get("t"), 0);
    }
}
