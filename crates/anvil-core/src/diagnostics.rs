//! Non-fatal import diagnostics
//!
//! Every recoverable problem found during an import (skipped faces, missing
//! textures, guessed attachment bones) is pushed into a `Diagnostics`
//! collector owned by that import call. The caller drains it once the import
//! returns and shows the summary to the user.

use std::fmt;

/// Number of message lines shown by [`Diagnostics::summary`]
pub const SUMMARY_LINES: usize = 5;

/// Category of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A face was skipped (degenerate or dropped duplicate)
    Geometry,
    /// A referenced resource could not be resolved and was substituted
    Resource,
    /// A heuristic had to guess (attachment bone)
    Heuristic,
    /// An existing material was reused instead of created
    Material,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Geometry => "geometry",
            DiagnosticKind::Resource => "resource",
            DiagnosticKind::Heuristic => "heuristic",
            DiagnosticKind::Material => "material",
        };
        f.write_str(s)
    }
}

/// A single recorded warning
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Collector for the warnings of one import operation
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = %kind, "{}", message);
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Count the recorded warnings of one kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Take every recorded warning, leaving the collector empty
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Append the warnings of another collector
    pub fn extend(&mut self, other: Vec<Diagnostic>) {
        self.entries.extend(other);
    }

    /// Render the user-facing summary, or `None` when there is nothing to show.
    ///
    /// Messages are prefixed with `--> `; only the first [`SUMMARY_LINES`] are
    /// listed and the rest are counted on a trailing line.
    pub fn summary(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let mut lines: Vec<String> = self
            .entries
            .iter()
            .take(SUMMARY_LINES)
            .map(|d| format!("--> {}", d.message))
            .collect();

        let remaining = self.entries.len().saturating_sub(SUMMARY_LINES);
        if remaining > 0 {
            lines.push(format!("... + {} more.", remaining));
        }

        Some(lines.join("\n"))
    }
}
