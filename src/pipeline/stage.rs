//! Pipeline stage trait

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{PipelineError, Result};
use super::types::{ExtractionOptions, JobState, ProcessingJob};
use crate::component::{Component, ComponentError, ComponentLease};

/// A discrete phase of a job that needs specific components live while it runs
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Stage name used in reports and errors
    fn name(&self) -> &'static str;

    /// Components acquired before `run` and released after it
    fn required_components(&self) -> &[&'static str];

    /// Whether the stage runs for these options
    fn is_enabled(&self, options: &ExtractionOptions) -> bool;

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()>;
}

/// What a running stage can see
pub struct StageContext<'a> {
    pub job: &'a ProcessingJob,
    pub state: &'a mut JobState,
    leases: &'a [ComponentLease],
}

impl<'a> StageContext<'a> {
    pub fn new(job: &'a ProcessingJob, state: &'a mut JobState, leases: &'a [ComponentLease]) -> Self {
        Self { job, state, leases }
    }

    /// A component leased for this stage, as its concrete type
    pub fn component<T: Component>(&self, name: &str) -> Result<Arc<T>> {
        let lease = self
            .leases
            .iter()
            .find(|lease| lease.name() == name)
            .ok_or_else(|| ComponentError::NotRegistered(name.to_string()))?;
        Ok(lease.get::<T>()?)
    }

    /// The parsed document, once the parse stage has run
    pub fn document(&self) -> Result<Arc<crate::processors::PdfHandle>> {
        self.state
            .document
            .clone()
            .ok_or(PipelineError::MissingInput("parsed document"))
    }
}
