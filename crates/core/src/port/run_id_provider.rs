// Run ID Provider Port (for deterministic testing)

/// Run ID provider interface (allows deterministic IDs in tests)
///
/// A run id tags every log line belonging to one sampling round so that
/// rounds can be told apart in long-running collection sessions.
pub trait RunIdProvider: Send + Sync {
    /// Generate a new unique run ID
    fn next_run_id(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidRunIdProvider;

impl RunIdProvider for UuidRunIdProvider {
    fn next_run_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
