//! Pipeline assembly.
//!
//! The chain is linked innermost first: dispatch, then access control around
//! it, then session around that. Outermost to innermost the order is always
//! session, security, dispatch; absent stages are skipped.

use std::fmt;
use std::sync::Arc;

use plinth_core::{Handler, PlinthResult};
use plinth_stages::{DispatchHandler, StageKind, WrapperStage};

/// An assembled, linked chain of stages.
pub struct Pipeline {
    head: Arc<dyn Handler>,
    dispatch: Arc<dyn DispatchHandler>,
    /// Outermost first.
    stages: Vec<Arc<dyn Handler>>,
    wrappers: Vec<Arc<dyn WrapperStage>>,
}

impl Pipeline {
    /// Links the stages into a chain.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use plinth_context::Pipeline;
    /// use plinth_stages::{DispatchStage, SecurityStage, WrapperStage};
    ///
    /// let security: Arc<dyn WrapperStage> = Arc::new(SecurityStage::allow_all());
    /// let pipeline = Pipeline::assemble(None, Some(security), Arc::new(DispatchStage::new()));
    /// assert_eq!(pipeline.names(), vec!["security", "dispatch"]);
    /// ```
    #[must_use]
    pub fn assemble(
        session: Option<Arc<dyn WrapperStage>>,
        security: Option<Arc<dyn WrapperStage>>,
        dispatch: Arc<dyn DispatchHandler>,
    ) -> Self {
        let mut innermost: Arc<dyn Handler> = Arc::clone(&dispatch).into_handler();
        let mut stages = vec![Arc::clone(&innermost)];
        let mut wrappers = Vec::with_capacity(2);

        for (kind, stage) in [(StageKind::Security, security), (StageKind::Session, session)] {
            let Some(stage) = stage else {
                continue;
            };
            stage.set_next(Arc::clone(&innermost));
            tracing::debug!(stage = %kind, next = innermost.name(), "Linked stage");
            wrappers.push(Arc::clone(&stage));
            innermost = stage.into_handler();
            stages.insert(0, Arc::clone(&innermost));
        }

        Self {
            head: innermost,
            dispatch,
            stages,
            wrappers,
        }
    }

    /// Returns the outermost stage.
    #[must_use]
    pub fn head(&self) -> &Arc<dyn Handler> {
        &self.head
    }

    /// Returns the dispatch stage at the end of the chain.
    #[must_use]
    pub fn dispatch(&self) -> &Arc<dyn DispatchHandler> {
        &self.dispatch
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always `false`: a pipeline holds at least the dispatch stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Starts every stage, innermost first.
    ///
    /// # Errors
    ///
    /// Returns the first stage error. Stages already started are stopped
    /// again before returning.
    pub fn start_all(&self) -> PlinthResult<()> {
        for (started, stage) in self.stages.iter().rev().enumerate() {
            if let Err(err) = stage.start() {
                tracing::error!(stage = stage.name(), error = %err, "Stage failed to start");
                for stage in self.stages.iter().rev().take(started).rev() {
                    stage.stop();
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Stops every stage, outermost first.
    pub fn stop_all(&self) {
        for stage in &self.stages {
            stage.stop();
        }
    }

    /// Clears the links of the wrapping stages.
    pub fn unlink(&self) {
        for wrapper in &self.wrappers {
            wrapper.clear_next();
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}
