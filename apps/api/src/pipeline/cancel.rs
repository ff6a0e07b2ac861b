use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pipeline::{PipelineError, Stage};

/// Caller-supplied cancellation signal. Cheap to clone; all clones share state.
///
/// Observed only at checkpoints: between stages and between attempts.
/// An LLM call already in flight runs to its own timeout.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_cancellation() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.checkpoint(Stage::Analyst).is_ok());

        clone.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(
            token.checkpoint(Stage::Synthesis),
            Err(PipelineError::Cancelled {
                stage: Stage::Synthesis
            })
        ));
    }
}
