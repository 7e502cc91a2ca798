use thiserror::Error;

/// Errors surfaced across the engine boundary.
///
/// Prediction-path problems never appear here — a bad input degrades to the
/// lowest-confidence sentinel instead of raising. Only bootstrap and the
/// retraining path return errors, because those are the cases the caller
/// must react to (no categorization possible / correction not applied).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The brand corpus or gazetteer could not be loaded at startup.
    /// Fatal: no categorization is possible without them.
    #[error("reference data unavailable: {0}")]
    ResourceUnavailable(String),

    /// Embedding, fitting, or publishing failed during a retrain.
    /// Recoverable: the previously published snapshot remains live and the
    /// triggering correction was not applied.
    #[error("retraining failed: {0}")]
    RetrainFailure(String),

    /// A retraining pass is already in progress; retry later.
    #[error("a retraining pass is already in progress")]
    RetrainInProgress,

    /// The collaborator store reported a failure.
    #[error("storage error: {0}")]
    Storage(String),
}
