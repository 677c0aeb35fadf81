// ABOUTME: Diagnostics accumulator for best-effort cleanup failures.
// ABOUTME: Collects warnings that explain leftovers without masking the primary result.

/// Collects non-fatal warnings during an execution or archive run.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The temporary script could not be deleted.
    pub fn temp_script(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TempScript,
            message: message.into(),
        }
    }

    /// The log could not be written or sealed cleanly.
    pub fn log_write(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LogWrite,
            message: message.into(),
        }
    }

    /// The execution record could not be persisted.
    pub fn record(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Record,
            message: message.into(),
        }
    }

    /// A partial snapshot could not be removed after a failed copy.
    pub fn snapshot_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SnapshotCleanup,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    TempScript,
    LogWrite,
    Record,
    SnapshotCleanup,
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

        diag.warn(Warning::temp_script("permission denied"));
        diag.warn(Warning::record("disk full"));

        assert!(diag.has_warnings());
        let kinds: Vec<_> = diag.into_warnings().iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::TempScript, WarningKind::Record]);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::log_write("x").kind, WarningKind::LogWrite);
        assert_eq!(
            Warning::snapshot_cleanup("x").kind,
            WarningKind::SnapshotCleanup
        );
    }
}
