//! Pipeline orchestrator
//!
//! Sequences catalog load, feature extraction, training and prediction over
//! a single [`PipelineState`]. Loading and training are async and guarded so
//! at most one of them runs at a time; status reads and predictions never
//! wait for either.

use super::state::{
    LoadOutcome, PipelineSnapshot, PipelineState, PipelineStatus, MSG_LOADING, MSG_NO_RECORDS,
    MSG_TRAINED, MSG_TRAINING,
};
use crate::catalog::{into_records, CatalogAccessor, SyntheticCatalog, DEFAULT_SYNTHETIC_SIZE};
use crate::error::{Operation, PipelineError, Result};
use crate::health::{components, ComponentHealth, ComponentStatus, HealthRegistry};
use crate::models::{CatalogPredictions, InventoryRecord, RecordPrediction};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::predictor::{
    self, coerce, extract, ClassifierSummary, ReorderDecision, TrainingConfig, TrainingSession,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;
use tracing::{debug, info};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of records generated when the catalog source fails
    pub synthetic_catalog_size: usize,
    /// Fixed seed for the synthetic catalog; entropy when absent
    pub synthetic_seed: Option<u64>,
    /// Service name attached to structured log events
    pub service_name: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            synthetic_catalog_size: DEFAULT_SYNTHETIC_SIZE,
            synthetic_seed: None,
            service_name: "forecast".to_string(),
        }
    }
}

/// Marks an operation as in flight until dropped
pub(crate) struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool, operation: Operation) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self { flag })
            .map_err(|_| PipelineError::AlreadyInProgress(operation))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the pipeline state and runs every operation on it
pub struct PipelineOrchestrator {
    accessor: Arc<dyn CatalogAccessor>,
    config: OrchestratorConfig,
    state: RwLock<PipelineState>,
    session: Arc<Mutex<TrainingSession>>,
    loading: AtomicBool,
    training: AtomicBool,
    health: HealthRegistry,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl PipelineOrchestrator {
    pub fn new(
        accessor: Arc<dyn CatalogAccessor>,
        config: OrchestratorConfig,
        health: HealthRegistry,
    ) -> Self {
        let logger = StructuredLogger::new(config.service_name.clone());
        Self {
            accessor,
            config,
            state: RwLock::new(PipelineState::default()),
            session: Arc::new(Mutex::new(TrainingSession::new())),
            loading: AtomicBool::new(false),
            training: AtomicBool::new(false),
            health,
            metrics: PipelineMetrics::new(),
            logger,
        }
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Description of the catalog source
    pub fn catalog_source(&self) -> String {
        self.accessor.describe()
    }

    /// Replace the in-memory catalog with a fresh fetch.
    ///
    /// Accessor failure is not an error: synthetic records are substituted
    /// and the outcome reports `Degraded`. The current classifier is kept.
    pub async fn load_catalog(&self) -> Result<LoadOutcome> {
        let _guard = InFlight::acquire(&self.loading, Operation::LoadCatalog)?;
        if self.training.load(Ordering::SeqCst) {
            return Err(PipelineError::AlreadyInProgress(Operation::Train));
        }

        self.update(|s| {
            s.status = PipelineStatus::LoadingCatalog;
            s.message = MSG_LOADING.to_string();
        });

        let source = self.accessor.describe();
        let start = Instant::now();
        let fetched = self.accessor.fetch().await;
        let elapsed = start.elapsed();
        self.metrics.observe_catalog_load(elapsed.as_secs_f64());

        let (records, outcome) = match fetched {
            Ok(entries) => {
                let records = into_records(entries);
                let count = records.len();
                self.logger.log_catalog_loaded(&source, count, elapsed.as_millis());
                self.health.set_healthy(components::CATALOG).await;
                (records, LoadOutcome::Live { count })
            }
            Err(e) => {
                let cause = format!("{:#}", e);
                let records = into_records(self.synthetic_catalog().generate());
                let count = records.len();
                self.logger.log_catalog_fallback(&source, &cause, count);
                self.metrics.inc_catalog_fallbacks();
                self.health
                    .set_degraded(
                        components::CATALOG,
                        format!(
                            "{}; serving {} synthetic records",
                            PipelineError::CatalogUnavailable(cause.clone()),
                            count
                        ),
                    )
                    .await;
                (records, LoadOutcome::Degraded { count, cause })
            }
        };

        let degraded = outcome.is_degraded();
        self.metrics.set_catalog(records.len(), degraded);
        let message = outcome.message();
        self.update(|s| {
            s.records = records;
            s.degraded = degraded;
            s.status = PipelineStatus::CatalogLoaded;
            s.message = message;
        });

        Ok(outcome)
    }

    /// Fit a new classifier on the loaded catalog.
    ///
    /// Rejected without touching the classifier or status when the config is
    /// invalid or no record survives extraction. Otherwise the current
    /// classifier is discarded up front and replaced only on success.
    pub async fn train(&self, config: TrainingConfig) -> Result<ClassifierSummary> {
        let _guard = InFlight::acquire(&self.training, Operation::Train)?;
        if self.loading.load(Ordering::SeqCst) {
            return Err(PipelineError::AlreadyInProgress(Operation::LoadCatalog));
        }
        config.validate()?;

        // One consistent snapshot of the catalog for the whole run
        let set = {
            let state = self.read();
            extract(&state.records)
        };
        if set.is_empty() {
            self.update(|s| s.message = MSG_NO_RECORDS.to_string());
            return Err(PipelineError::EmptyTrainingSet);
        }

        self.update(|s| {
            s.status = PipelineStatus::Training;
            s.message = MSG_TRAINING.to_string();
            s.classifier = None;
        });
        self.logger
            .log_training_started(set.len(), set.positive_count(), config.epochs);

        let start = Instant::now();
        let session = Arc::clone(&self.session);
        let joined = tokio::task::spawn_blocking(move || {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            let result = session.fit(&set, &config);
            (result, session.classifier().generation())
        })
        .await;
        let elapsed = start.elapsed();
        self.metrics.observe_training(elapsed.as_secs_f64());

        let worker_lost = joined.is_err();
        let result = match joined {
            Ok((result, generation)) => {
                self.metrics.set_model_generation(generation);
                result
            }
            Err(e) => Err(PipelineError::TrainingFailed(format!(
                "training worker stopped: {}",
                e
            ))),
        };

        match result {
            Ok(classifier) => {
                let summary = classifier.summary();
                if let Some(report) = classifier.report() {
                    self.logger.log_training_completed(
                        classifier.generation(),
                        report.rows,
                        report.final_loss,
                        report.training_accuracy,
                        elapsed.as_millis(),
                    );
                }
                self.health.set_healthy(components::TRAINER).await;
                self.health.set_healthy(components::PREDICTOR).await;
                self.update(|s| {
                    s.classifier = Some(classifier);
                    s.status = PipelineStatus::Ready;
                    s.message = MSG_TRAINED.to_string();
                });
                Ok(summary)
            }
            Err(e) => {
                let cause = match e {
                    PipelineError::TrainingFailed(cause) => cause,
                    other => other.to_string(),
                };
                self.logger.log_training_failed(&cause);
                self.metrics.inc_training_failures();
                self.health
                    .set(components::TRAINER, trainer_health(&cause, worker_lost))
                    .await;
                self.health
                    .set_degraded(components::PREDICTOR, "no trained classifier")
                    .await;
                let message = format!("Training failed: {}", cause);
                self.update(|s| {
                    s.classifier = None;
                    s.status = PipelineStatus::Error;
                    s.message = message;
                });
                Err(PipelineError::TrainingFailed(cause))
            }
        }
    }

    /// Reorder probability for one record
    pub fn predict(&self, record: &InventoryRecord) -> Result<f64> {
        let start = Instant::now();
        let probability = {
            let state = self.read();
            let classifier = state
                .classifier
                .as_ref()
                .ok_or(PipelineError::ModelNotTrained)?;
            let features = coerce(record)
                .ok_or_else(|| PipelineError::MalformedRecord(record.id.to_string()))?;
            predictor::predict(classifier, &features)?
        };
        self.metrics.observe_prediction(start.elapsed().as_secs_f64());
        Ok(probability)
    }

    /// Predictions for every loaded record, in catalog order, together with
    /// the generation that scored them.
    ///
    /// Records without a prediction (no trained classifier, or a record
    /// that cannot be coerced) carry `None`.
    pub fn predict_all(&self) -> CatalogPredictions {
        let state = self.read();
        let classifier = state.classifier.as_ref().filter(|c| c.is_trained());

        let predictions: Vec<RecordPrediction> = state
            .records
            .iter()
            .map(|record| {
                let start = Instant::now();
                let probability = classifier.and_then(|c| {
                    let features = coerce(record)?;
                    predictor::predict(c, &features).ok()
                });
                if probability.is_some() {
                    self.metrics.observe_prediction(start.elapsed().as_secs_f64());
                }
                RecordPrediction {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    inventory_level: record.inventory_level,
                    average_sales: record.average_sales,
                    lead_time_days: record.lead_time_days,
                    probability,
                    decision: probability.map(ReorderDecision::from_probability),
                }
            })
            .collect();

        debug!(
            records = predictions.len(),
            scored = predictions.iter().filter(|p| p.probability.is_some()).count(),
            "Scored catalog"
        );
        CatalogPredictions {
            generation: classifier.map(|c| c.generation()),
            predictions,
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.read().snapshot()
    }

    fn synthetic_catalog(&self) -> SyntheticCatalog {
        let catalog = SyntheticCatalog::new(self.config.synthetic_catalog_size);
        match self.config.synthetic_seed {
            Some(seed) => catalog.with_seed(seed),
            None => catalog,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PipelineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` under the write lock. Never held across an await point.
    fn update<F: FnOnce(&mut PipelineState)>(&self, f: F) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
        info!(status = %state.status, message = %state.message, "Pipeline state updated");
    }
}

/// A failed fit leaves the trainer usable; a lost worker thread does not
pub(crate) fn trainer_health(cause: &str, worker_lost: bool) -> ComponentHealth {
    if worker_lost {
        ComponentHealth::new(ComponentStatus::Unhealthy, Some(cause.to_string()))
    } else {
        ComponentHealth::new(
            ComponentStatus::Degraded,
            Some(format!("last run failed: {}", cause)),
        )
    }
}
