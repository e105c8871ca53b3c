//! Metric names emitted by Plinth.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `plinth_dispatch_total` | Counter | `unit`, `status` | Requests dispatched to a unit |
//! | `plinth_dispatch_not_found_total` | Counter | - | Requests no mapping matched |
//! | `plinth_lifecycle_transitions_total` | Counter | `context`, `to` | Lifecycle transitions |
//!
//! Counters go through the `metrics` facade. No exporter is installed here;
//! the embedding application picks one.

use metrics::{describe_counter, Unit};

/// Requests dispatched to a unit.
pub const DISPATCH_TOTAL: &str = "plinth_dispatch_total";

/// Requests that matched no unit mapping.
pub const DISPATCH_NOT_FOUND_TOTAL: &str = "plinth_dispatch_not_found_total";

/// Lifecycle transitions of a context.
pub const LIFECYCLE_TRANSITIONS_TOTAL: &str = "plinth_lifecycle_transitions_total";

/// Registers descriptions for the standard metrics with the installed recorder.
///
/// Call once after installing an exporter.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, Unit::Count, "Requests dispatched to a unit");
    describe_counter!(
        DISPATCH_NOT_FOUND_TOTAL,
        Unit::Count,
        "Requests that matched no unit mapping"
    );
    describe_counter!(
        LIFECYCLE_TRANSITIONS_TOTAL,
        Unit::Count,
        "Lifecycle transitions of a context"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [DISPATCH_TOTAL, DISPATCH_NOT_FOUND_TOTAL, LIFECYCLE_TRANSITIONS_TOTAL] {
            assert!(name.starts_with("plinth_"));
            assert!(name.ends_with("_total"));
        }
    }

    #[test]
    fn test_describe_without_recorder() {
        // The no-op recorder accepts descriptions.
        describe_metrics();
    }
}
