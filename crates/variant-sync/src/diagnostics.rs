//! Diagnostics emitted while syncing and recording
//!
//! Recoverable problems never abort an operation. They are reported to a
//! [`DiagnosticSink`] injected by the caller and the offending item is
//! skipped. [`TracingSink`] forwards to `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use variant_model::{PropertyPath, StableId};

/// Severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

/// Unrecognized level name
#[derive(Debug, thiserror::Error)]
#[error("unknown diagnostic level '{0}'")]
pub struct UnknownLevel(pub String);

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Progress of an operation step
    Progress,
    /// A single field was copied, recorded or replayed
    Field,
    /// Override source maps to no live node
    UnresolvedTarget,
    /// Override source maps to a node outside the variant container
    OutsideVariant,
    /// Override path does not exist on the target node
    MissingPath,
    /// Override payload does not fit the field kind
    PayloadMismatch,
    /// Scalar payload could not be decoded into the field's representation
    DecodeFailed,
    /// Embedded polymorphic field skipped
    PolymorphicSkipped,
    /// Source and target disagree on a field's kind
    KindMismatch,
}

/// One diagnostic record
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub kind: DiagnosticKind,
    /// Operation step that emitted it, e.g. `replay_overrides`
    pub step: &'static str,
    pub message: String,
    pub node: Option<StableId>,
    pub path: Option<PropertyPath>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        level: Level,
        kind: DiagnosticKind,
        step: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind,
            step,
            message: message.into(),
            node: None,
            path: None,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: Option<StableId>) -> Self {
        self.node = node;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: &PropertyPath) -> Self {
        self.path = Some(path.clone());
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.step, self.message)?;
        if let Some(node) = self.node {
            write!(f, "; node = {node}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; path = {path}")?;
        }
        Ok(())
    }
}

/// Receiver of engine diagnostics
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards diagnostics at or above `min_level` to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    min_level: Level,
}

impl TracingSink {
    #[inline]
    #[must_use]
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    #[inline]
    #[must_use]
    pub fn min_level(&self) -> Level {
        self.min_level
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&self, d: Diagnostic) {
        if d.level < self.min_level {
            return;
        }
        let node = d.node.map(|id| id.to_string());
        let path = d.path.as_ref().map(ToString::to_string);
        match d.level {
            Level::Debug => {
                tracing::debug!(step = d.step, kind = ?d.kind, ?node, ?path, "{}", d.message);
            }
            Level::Info => {
                tracing::info!(step = d.step, kind = ?d.kind, ?node, ?path, "{}", d.message);
            }
            Level::Warn => {
                tracing::warn!(step = d.step, kind = ?d.kind, ?node, ?path, "{}", d.message);
            }
            Level::Error => {
                tracing::error!(step = d.step, kind = ?d.kind, ?node, ?path, "{}", d.message);
            }
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert_eq!(Level::default(), Level::Info);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("trace".parse::<Level>().unwrap(), Level::Debug);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn display_includes_context() {
        let path: PropertyPath = "clips[0].start".parse().unwrap();
        let d = Diagnostic::new(
            Level::Error,
            DiagnosticKind::MissingPath,
            "replay_overrides",
            "property not found",
        )
        .with_path(&path);
        assert_eq!(
            d.to_string(),
            "[replay_overrides] property not found; path = clips[0].start"
        );
    }

    #[test]
    fn level_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Warn).unwrap(), "\"warn\"");
        let level: Level = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, Level::Error);
    }
}
