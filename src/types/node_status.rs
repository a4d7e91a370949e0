//! Status value broadcast by a node after a lifecycle operation.

use std::fmt;

/// Status value broadcast by a node after a lifecycle operation.
///
/// A node carries at most one current status (`Option<NodeStatus>` on the
/// coordinator); each lifecycle operation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
  /// Recoverable misconfiguration on a fully wired node.
  Warning(String),
  /// A failed lifecycle operation.
  Error(String),
  /// Execution was canceled through the execution context.
  ExecutionCanceled(String),
  /// The node was reset.
  Reset,
  /// The node was configured successfully.
  Configured,
  /// Execution is about to start.
  StartExecute,
  /// Execution finished (successfully or as a precondition no-op).
  EndExecute,
}

impl NodeStatus {
  /// The message carried by message-bearing variants.
  pub fn message(&self) -> Option<&str> {
    match self {
      NodeStatus::Warning(m) | NodeStatus::Error(m) | NodeStatus::ExecutionCanceled(m) => Some(m),
      _ => None,
    }
  }

  pub fn is_warning(&self) -> bool {
    matches!(self, NodeStatus::Warning(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, NodeStatus::Error(_))
  }
}

impl fmt::Display for NodeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeStatus::Warning(m) => write!(f, "warning: {m}"),
      NodeStatus::Error(m) => write!(f, "error: {m}"),
      NodeStatus::ExecutionCanceled(m) => write!(f, "canceled: {m}"),
      NodeStatus::Reset => write!(f, "reset"),
      NodeStatus::Configured => write!(f, "configured"),
      NodeStatus::StartExecute => write!(f, "start execute"),
      NodeStatus::EndExecute => write!(f, "end execute"),
    }
  }
}
