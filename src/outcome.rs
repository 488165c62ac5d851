//! Success-or-error outcome abstraction.
//!
//! Lets the caching decorator detect, unwrap, and rewrap a handler's
//! success value without compile-time knowledge of the handler's error
//! type. `Result` is the canonical instance. The impl is resolved per
//! concrete outcome type at compile time, so there is no per-call dispatch
//! and no runtime type inspection.

/// A value that is either a success payload or an error.
pub trait Outcome: Sized + Send {
    /// The success payload type.
    type Value;

    /// Whether this outcome represents failure.
    fn is_error(&self) -> bool;

    /// Extract the success payload.
    ///
    /// # Panics
    ///
    /// Panics when called on an error outcome. That indicates a defect in
    /// the caller's branching, not a runtime condition.
    fn unwrap_value(self) -> Self::Value;

    /// Lift a bare value into the success shape.
    fn wrap_value(value: Self::Value) -> Self;
}

impl<V: Send, E: Send> Outcome for Result<V, E> {
    type Value = V;

    fn is_error(&self) -> bool {
        self.is_err()
    }

    fn unwrap_value(self) -> V {
        match self {
            Ok(value) => value,
            Err(_) => panic!("unwrap_value called on an error outcome"),
        }
    }

    fn wrap_value(value: V) -> Self {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestOutcome = Result<Vec<String>, String>;

    #[test]
    fn wrap_then_unwrap_round_trips() {
        let value = vec!["A".to_string(), "B".to_string()];
        let outcome = TestOutcome::wrap_value(value.clone());
        assert!(!outcome.is_error());
        assert_eq!(outcome.unwrap_value(), value);
    }

    #[test]
    fn error_outcome_reports_error() {
        let outcome: TestOutcome = Err("not found".to_string());
        assert!(outcome.is_error());
    }

    #[test]
    #[should_panic(expected = "unwrap_value called on an error outcome")]
    fn unwrap_value_on_error_is_fatal() {
        let outcome: TestOutcome = Err("not found".to_string());
        let _ = outcome.unwrap_value();
    }
}
