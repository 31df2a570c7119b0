//! Error taxonomy for render-phase failures.

use std::error::Error;
use std::fmt;

/// Why a render session was abandoned.
///
/// A failed render leaves no trace: the committed tree, its hook state and
/// every pending update queue are exactly as they were before the session
/// started. The error travels back through the scheduled task so the
/// embedder can decide whether to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A component called fewer or more hooks than on its previous render.
    HookCountMismatch { previous: usize, current: usize },
    /// The hook at `index` changed kind between renders, e.g. a state
    /// hook where an effect hook used to be.
    HookKindMismatch { index: usize },
    /// A hook was called with no render in progress.
    HookOutsideRender,
    /// A component panicked while rendering. The panic was caught at the
    /// unit-of-work boundary and converted into this error.
    ComponentPanicked { message: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::HookCountMismatch { previous, current } => write!(
                f,
                "rendered {current} hooks where the previous render had {previous}"
            ),
            RenderError::HookKindMismatch { index } => {
                write!(f, "hook at position {index} changed kind between renders")
            }
            RenderError::HookOutsideRender => {
                write!(f, "hook called outside of a render")
            }
            RenderError::ComponentPanicked { message } => {
                write!(f, "component panicked during render: {message}")
            }
        }
    }
}

impl Error for RenderError {}
