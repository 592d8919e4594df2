use std::fmt;

use crate::arena::NodeId;

/// A verifier finding (error or warning) attached to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub node: NodeId,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl Diagnostic {
    pub fn error(message: String, node: NodeId) -> Self {
        Self {
            severity: Severity::Error,
            message,
            node,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, node: NodeId) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            node,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} at {}: {}", level, self.node, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}
