//! Error kinds returned by hydroeval's public API.
//!
//! Metric internal failures never surface through [`Error`] — a failing metric
//! produces a [`crate::scoring::Score`] carrying `fails_on`/NaN instead, per the
//! propagation rule in the scoring engine's contract.

/// The error type returned by fallible hydroeval operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A non-numeric metric weight, an empty metric list at scoring time, a
    /// non-positive threshold weight, or a duplicate threshold registration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A handler's signature does not comply with the event signature it was
    /// registered against.
    #[error("handler signature is not compatible with the declared event signature: {0}")]
    Compatibility(String),

    /// An unknown event name was triggered with `fail_on_missing_event` set, or
    /// an unknown threshold/metric was requested from a `Scores`/`MetricResults`
    /// accessor.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// A restorable `Package` referenced a module/name that could not be
    /// resolved, came from the process entry module, or named an asynchronous
    /// callable.
    #[error("could not restore package: {0}")]
    Restore(String),

    /// A restorable's positional or keyword arguments could not be serialized
    /// into a transport-safe form.
    #[error("could not serialize restorable arguments: {0}")]
    Serialization(String),

    /// An unknown operator or cast, a sandbox denial, a detected loop in
    /// repeated transformation, or a cycle in variable substitution.
    #[error("expression error: {0}")]
    Expression(String),

    /// A communicator exhausted its retry budget enqueuing a message, or could
    /// not deliver an error message at all.
    #[error("communicator error: {0}")]
    Communicator(String),
}

/// The result type returned by fallible hydroeval operations.
pub type Result<T> = std::result::Result<T, Error>;
