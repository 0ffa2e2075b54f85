// ── Orchestrator ──
//
// Walks a plan in order, one resource at a time. Suspension happens only
// at remote-call boundaries, so a cancellation or a failure never leaves a
// half-executed resource behind: already-completed resources stay as they
// are and the rest are reported as abandoned.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, RunMode};
use crate::error::CoreError;
use crate::graph::Plan;
use crate::invoker::{Invoker, Mode, Outcome, Prediction, RunOutputs};
use crate::model::ResourceKind;
use crate::remote::RemoteApi;
use crate::store::{ResourceRecord, StateStore};

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResource {
    pub name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFailure {
    pub name: String,
    /// `service:action` that was attempted.
    pub action: String,
    pub reason: String,
    #[serde(skip)]
    pub error: CoreError,
}

/// Result of one apply or destroy run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: Mode,
    pub run_mode: RunMode,
    pub completed: Vec<CompletedResource>,
    pub failed: Vec<ResourceFailure>,
    /// Never started, because of a failure or a cancellation.
    pub abandoned: Vec<String>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(mode: Mode, run_mode: RunMode) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            mode,
            run_mode,
            completed: Vec::new(),
            failed: Vec::new(),
            abandoned: Vec::new(),
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.abandoned.is_empty() && !self.cancelled
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.completed.iter().filter(|c| c.outcome == outcome).count()
    }

    /// The first failure, which decides the exit status.
    pub fn first_error(&self) -> Option<&CoreError> {
        self.failed.first().map(|f| &f.error)
    }
}

/// Predicted effect of applying one resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub name: String,
    pub kind: ResourceKind,
    pub action: String,
    pub prediction: Prediction,
    pub depends_on: Vec<String>,
}

// ── Orchestrator ────────────────────────────────────────────────────

/// Runs whole plans against a [`RemoteApi`].
pub struct Orchestrator<R> {
    api: R,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl<R: RemoteApi> Orchestrator<R> {
    pub fn new(api: R, config: EngineConfig) -> Self {
        Self {
            api,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token (e.g. tripped by Ctrl-C).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn api(&self) -> &R {
        &self.api
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn invoker<'a>(&'a self, store: &'a StateStore) -> Invoker<'a, R> {
        Invoker::new(&self.api, store, &self.config.retry)
    }

    // ── Apply ────────────────────────────────────────────────────────

    /// Bring every resource in `plan` to its desired state.
    pub async fn apply(&self, plan: &Plan, store: &StateStore) -> RunReport {
        let mut report = RunReport::new(Mode::Apply, self.config.mode);
        let span = info_span!("apply", run_id = %report.run_id);

        async {
            info!(resources = plan.len(), mode = %self.config.mode, "apply started");
            let invoker = self.invoker(store);
            let mut outputs = RunOutputs::new();
            let mut blocked: HashSet<&str> = HashSet::new();
            let mut halted = false;

            for step in plan.steps() {
                let d = &step.descriptor;

                if halted || self.cancel.is_cancelled() {
                    report.cancelled |= self.cancel.is_cancelled();
                    report.abandoned.push(d.name.clone());
                    continue;
                }
                if step.dependencies.iter().any(|dep| blocked.contains(dep.as_str())) {
                    warn!(resource = %d.name, "skipped: a dependency failed");
                    blocked.insert(&d.name);
                    report.abandoned.push(d.name.clone());
                    continue;
                }

                let result = invoker
                    .invoke(d, Mode::Apply, &mut outputs)
                    .instrument(info_span!("resource", resource = %d.name, action = %d.create.label()))
                    .await;

                match result {
                    Ok(outcome) => report.completed.push(CompletedResource {
                        name: d.name.clone(),
                        outcome,
                    }),
                    Err(err) => {
                        error!(resource = %d.name, error = %err, "apply failed");
                        blocked.insert(&d.name);
                        report.failed.push(ResourceFailure {
                            name: d.name.clone(),
                            action: d.create.label(),
                            reason: err.to_string(),
                            error: err,
                        });
                        halted = self.config.mode == RunMode::FailFast;
                    }
                }
            }

            report.finished_at = Utc::now();
            info!(
                completed = report.completed.len(),
                failed = report.failed.len(),
                abandoned = report.abandoned.len(),
                "apply finished"
            );
        }
        .instrument(span)
        .await;

        report
    }

    // ── Destroy ──────────────────────────────────────────────────────

    /// Delete every recorded resource, newest first.
    ///
    /// Driven by the store rather than a plan, so resources that are no
    /// longer declared are still torn down in reverse creation order.
    pub async fn destroy(&self, store: &StateStore) -> RunReport {
        self.teardown(store.teardown_order(), store).await
    }

    /// Delete `target` and every recorded resource that depends on it in
    /// `plan`, newest first. Everything else is left alone, so a broken
    /// subtree can be reissued by a following `apply`.
    pub async fn destroy_target(
        &self,
        plan: &Plan,
        store: &StateStore,
        target: &str,
    ) -> Result<RunReport, CoreError> {
        let affected = plan.dependents_of(target);
        if affected.is_empty() {
            return Err(CoreError::Config {
                message: format!("'{target}' is not declared in the stack"),
            });
        }
        let records = store
            .teardown_order()
            .into_iter()
            .filter(|r| affected.contains(&r.logical_name.as_str()))
            .collect();
        Ok(self.teardown(records, store).await)
    }

    async fn teardown(&self, records: Vec<ResourceRecord>, store: &StateStore) -> RunReport {
        let mut report = RunReport::new(Mode::Destroy, self.config.mode);
        let span = info_span!("destroy", run_id = %report.run_id);

        async {
            info!(resources = records.len(), "destroy started");
            let invoker = self.invoker(store);
            let mut halted = false;

            for record in records {
                let name = record.logical_name;
                if halted || self.cancel.is_cancelled() {
                    report.cancelled |= self.cancel.is_cancelled();
                    report.abandoned.push(name);
                    continue;
                }

                let action = record
                    .delete
                    .as_ref()
                    .map_or_else(|| "forget".to_owned(), |c| c.label());
                let result = invoker
                    .destroy(&name)
                    .instrument(info_span!("resource", resource = %name, action = %action))
                    .await;

                match result {
                    Ok(outcome) => report.completed.push(CompletedResource { name, outcome }),
                    Err(err) => {
                        error!(resource = %name, error = %err, "destroy failed");
                        report.failed.push(ResourceFailure {
                            name,
                            action,
                            reason: err.to_string(),
                            error: err,
                        });
                        // Teardown never skips past a failed resource,
                        // regardless of run mode.
                        halted = true;
                    }
                }
            }

            report.finished_at = Utc::now();
            info!(
                completed = report.completed.len(),
                failed = report.failed.len(),
                "destroy finished"
            );
        }
        .instrument(span)
        .await;

        report
    }

    // ── Preview ──────────────────────────────────────────────────────

    /// Predict the outcome of `apply` without any remote call.
    pub fn preview(&self, plan: &Plan, store: &StateStore) -> Result<Vec<PlannedChange>, CoreError> {
        let invoker = self.invoker(store);
        let mut outputs = RunOutputs::new();
        let mut changes = Vec::with_capacity(plan.len());
        for step in plan.steps() {
            let d = &step.descriptor;
            let prediction = invoker.predict(d, &mut outputs)?;
            changes.push(PlannedChange {
                name: d.name.clone(),
                kind: d.kind,
                action: d.create.label(),
                prediction,
                depends_on: step.dependencies.clone(),
            });
        }
        Ok(changes)
    }
}
