// ABOUTME: Diagnostics accumulator for non-fatal warnings during a publish.
// ABOUTME: Warnings never fail a deployment; they are logged and carried on the result.

use serde::Serialize;

/// Collects non-fatal warnings during a publish.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    /// Create a post-publish verification warning.
    pub fn verification(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Verification, message)
    }

    /// Create a warning for a path the cleanup walk could not handle.
    pub fn cleanup_path(path: &str, message: &str) -> Self {
        Self::new(WarningKind::CleanupPath, format!("{path}: {message}"))
    }

    /// Create a warning for a stale lock that was broken.
    pub fn stale_lock(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StaleLock, message)
    }

    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Failed to release the deployment lock (lock file may remain).
    LockRelease,
    /// The published site could not be confirmed in time.
    Verification,
    /// A path could not be inspected or removed during cleanup.
    CleanupPath,
    /// A stale lock left by another run was broken.
    StaleLock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::lock_release("failed to remove lock file"));
        diag.warn(Warning::verification("site not reachable"));

        assert!(diag.has_warnings());
        assert_eq!(diag.into_warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::lock_release("x").kind, WarningKind::LockRelease);
        assert_eq!(Warning::verification("x").kind, WarningKind::Verification);
        assert_eq!(Warning::stale_lock("x").kind, WarningKind::StaleLock);

        let path = Warning::cleanup_path("old/a.txt", "permission denied");
        assert_eq!(path.kind, WarningKind::CleanupPath);
        assert_eq!(path.message, "old/a.txt: permission denied");
    }

    #[test]
    fn warnings_serialize_with_snake_case_kind() {
        let json = serde_json::to_string(&Warning::lock_release("x")).unwrap();
        assert_eq!(json, r#"{"kind":"lock_release","message":"x"}"#);
    }
}
