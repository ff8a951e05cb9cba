//! Pipeline orchestrator
//!
//! Runs a job's enabled stages in order. Each stage acquires its
//! components from the [`ComponentManager`] on entry and releases them on
//! exit; whether a release actually unloads is up to the manager's
//! [`UnloadPolicy`](crate::component::UnloadPolicy).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};

use super::error::{PipelineError, Result};
use super::memory::{MemoryProbe, PeakSampler, ProcessMemoryProbe};
use super::stage::{PipelineStage, StageContext};
use super::stages::default_stages;
use super::types::{JobState, JobStatus, ProcessingJob, ProcessingResult, StageReport};
use crate::component::{ComponentLease, ComponentManager, UnloadOutcome};
use crate::config::PipelineConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Drives processing jobs through the pipeline stages
pub struct PipelineOrchestrator {
    manager: ComponentManager,
    stages: Vec<Box<dyn PipelineStage>>,
    config: PipelineConfig,
    probe: Arc<dyn MemoryProbe>,
}

impl PipelineOrchestrator {
    /// Orchestrator with the built-in stages and process memory sampling
    pub fn new(manager: ComponentManager, config: PipelineConfig) -> Self {
        Self {
            manager,
            stages: default_stages(),
            config,
            probe: Arc::new(ProcessMemoryProbe),
        }
    }

    pub fn with_stages(mut self, stages: Vec<Box<dyn PipelineStage>>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn manager(&self) -> &ComponentManager {
        &self.manager
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run a job to completion
    ///
    /// A component that fails to load aborts the job with
    /// [`PipelineError::StageAborted`]; a stage that fails while running
    /// ends it with [`PipelineError::StageFailed`]. Components acquired by
    /// the failing stage are released either way. Cleanup failures and
    /// memory ceiling overruns only add warnings.
    pub async fn run(&self, job: ProcessingJob) -> Result<ProcessingResult> {
        if job.document_id.trim().is_empty() {
            return Err(PipelineError::InvalidJob("document id is empty".to_string()));
        }

        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Starting job {} for document {}", job.id, job.document_id);

        let mut state = JobState::default();
        let mut reports: Vec<StageReport> = Vec::new();
        let mut components_used: Vec<String> = Vec::new();
        let ceiling = self.config.memory_ceiling_bytes();

        for stage in &self.stages {
            if !stage.is_enabled(&job.options) {
                debug!("Skipping stage {} for job {}", stage.name(), job.id);
                continue;
            }

            let report = match self.run_stage(stage.as_ref(), &job, &mut state).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Job {} failed: {}", job.id, e);
                    return Err(e);
                }
            };

            for component in &report.components {
                if !components_used.contains(component) {
                    components_used.push(component.clone());
                }
            }

            if report.memory_peak_bytes > ceiling {
                state.warn(format!(
                    "Stage {} peaked at {} MB, above the {} MB ceiling",
                    report.stage,
                    report.memory_peak_bytes / BYTES_PER_MB,
                    self.config.memory_ceiling_mb
                ));
            }

            reports.push(report);
        }

        let total_pages = state.total_pages();
        let JobState { items, warnings, .. } = state;
        let status = if warnings.is_empty() {
            JobStatus::Completed
        } else {
            JobStatus::CompletedWithWarnings
        };
        let peak_memory_bytes = reports
            .iter()
            .map(|report| report.memory_peak_bytes)
            .max()
            .unwrap_or(0);

        info!(
            "Job {} finished in {:?}: {} pages, {} items, {} warnings",
            job.id,
            timer.elapsed(),
            total_pages,
            items.len(),
            warnings.len()
        );

        Ok(ProcessingResult {
            job_id: job.id,
            document_id: job.document_id,
            status,
            total_pages,
            items,
            stages: reports,
            components_used,
            warnings,
            started_at,
            completed_at: Utc::now(),
            peak_memory_bytes,
        })
    }

    async fn run_stage(
        &self,
        stage: &dyn PipelineStage,
        job: &ProcessingJob,
        state: &mut JobState,
    ) -> Result<StageReport> {
        let name = stage.name();
        let started_at = Utc::now();
        let timer = Instant::now();
        let items_before = state.items.len();

        let memory_before = self.probe.current_bytes();
        let sampler = PeakSampler::start(
            self.probe.clone(),
            Duration::from_millis(self.config.memory_sample_interval_ms),
            memory_before,
        );

        debug!("Stage {} acquiring {:?}", name, stage.required_components());
        let mut leases: Vec<ComponentLease> = Vec::with_capacity(stage.required_components().len());
        for component in stage.required_components() {
            match self.manager.acquire(component).await {
                Ok(lease) => leases.push(lease),
                Err(source) => {
                    error!("Stage {} could not load {}: {}", name, component, source);
                    self.release_all(leases, state).await;
                    return Err(PipelineError::StageAborted { stage: name, source });
                }
            }
        }
        let components: Vec<String> = leases.iter().map(|lease| lease.name().to_string()).collect();

        let outcome = {
            let mut ctx = StageContext::new(job, state, &leases);
            stage.run(&mut ctx).await
        };

        let unload_outcomes = self.release_all(leases, state).await;
        let memory_peak = sampler.finish().await;
        let memory_after = self.probe.current_bytes();

        if let Err(e) = outcome {
            return Err(PipelineError::StageFailed {
                stage: name,
                source: Box::new(e),
            });
        }

        let report = StageReport {
            stage: name,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            components,
            memory_before_bytes: memory_before,
            memory_peak_bytes: memory_peak.max(memory_after),
            memory_after_bytes: memory_after,
            items_added: state.items.len().saturating_sub(items_before),
            unload_outcomes,
        };

        info!(
            "Stage {} done in {} ms ({} items, peak {} MB)",
            name,
            report.duration_ms,
            report.items_added,
            report.memory_peak_bytes / BYTES_PER_MB
        );
        Ok(report)
    }

    /// Release leases in acquisition order, recording cleanup failures as warnings
    async fn release_all(
        &self,
        leases: Vec<ComponentLease>,
        state: &mut JobState,
    ) -> Vec<(String, UnloadOutcome)> {
        let mut outcomes = Vec::new();
        for lease in leases {
            let name = lease.name().to_string();
            let Some(outcome) = self.manager.release(lease).await else {
                continue;
            };
            if let UnloadOutcome::CleanupFailed(reason) = &outcome {
                state.warn(format!("Failed to unload {}: {}", name, reason));
            }
            outcomes.push((name, outcome));
        }
        outcomes
    }
}
