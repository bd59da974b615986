//! Dashboard statistics aggregator.
//!
//! Fans out one retrieval per role, bounded by a semaphore and a
//! per-request timeout, and folds whatever comes back into a complete
//! [`DashboardStats`]. Transient failures are retried with backoff. Retrieval failures never escape: a failed role
//! contributes zero-valued stats and the failure goes to a
//! [`StatsReporter`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::StoreError;
use crate::model::{EvaluationRecord, Role};
use crate::statistics::{build_dashboard, DashboardStats, DEFAULT_RECENT_LIMIT};
use crate::traits::EvaluationStore;

/// Configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum concurrent retrievals.
    pub parallelism: usize,
    /// Deadline for a single retrieval.
    pub request_timeout: Duration,
    /// Size of the recent-activity window.
    pub recent_limit: usize,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            request_timeout: Duration::from_secs(10),
            recent_limit: DEFAULT_RECENT_LIMIT,
            max_retries: 1,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// A role whose history could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFailure {
    pub role_id: String,
    pub role_title: String,
    pub error: StoreError,
}

/// Receives non-fatal problems found while aggregating.
pub trait StatsReporter: Send + Sync {
    /// Some, but not all, roles failed. Called at most once per aggregation.
    fn on_partial_failure(&self, failures: &[RoleFailure]);
    /// Every role failed. Called instead of `on_partial_failure`.
    fn on_total_failure(&self, failures: &[RoleFailure]);
    /// A role's history contained records decoded with substitutions.
    fn on_malformed_records(&self, role: &Role, records: &[&EvaluationRecord]);
}

/// No-op reporter.
pub struct NoopReporter;

impl StatsReporter for NoopReporter {
    fn on_partial_failure(&self, _: &[RoleFailure]) {}
    fn on_total_failure(&self, _: &[RoleFailure]) {}
    fn on_malformed_records(&self, _: &Role, _: &[&EvaluationRecord]) {}
}

/// Identifies one aggregation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(pub u64);

/// What happened to a refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The result is now the latest one.
    Published(DashboardStats),
    /// A later refresh (or an invalidation) started first; result discarded.
    Superseded,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: Generation,
    stats: DashboardStats,
}

/// Computes dashboard statistics against an evaluation store.
pub struct StatsAggregator {
    store: Arc<dyn EvaluationStore>,
    config: AggregatorConfig,
    generation: AtomicU64,
    latest: Mutex<Option<Slot>>,
}

type Outcome = Result<Vec<EvaluationRecord>, StoreError>;

impl StatsAggregator {
    pub fn new(store: Arc<dyn EvaluationStore>, config: AggregatorConfig) -> Self {
        Self {
            store,
            config,
            generation: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fetch each role's history and fold it into dashboard stats.
    ///
    /// Always returns one entry per role, in `roles` order.
    pub async fn compute_stats(
        &self,
        user: &str,
        roles: &[Role],
        reporter: &dyn StatsReporter,
    ) -> DashboardStats {
        if roles.is_empty() {
            tracing::debug!("no roles requested, returning empty stats");
            return build_dashboard(&[], &[], self.config.recent_limit);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, role) in roles.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let user = user.to_string();
            let role_id = role.id.clone();
            let config = self.config.clone();

            futures.push(async move {
                let outcome: Outcome = async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| StoreError::Network("retrieval pool closed".into()))?;
                    fetch_with_retry(&config, &role_id, || {
                        store.role_evaluations(&user, &role_id)
                    })
                    .await
                }
                .await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; roles.len()];
        while let Some((index, outcome)) = futures.next().await {
            outcomes[index] = Some(outcome);
        }

        let outcomes = outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| Err(StoreError::Network("retrieval dropped".into()))))
            .collect();

        self.fold(roles, outcomes, reporter)
    }

    /// Fetch the user's combined history once and split it by role.
    ///
    /// Records are matched on `role_id`, then on `role_title`; records for
    /// roles that were not requested are ignored.
    pub async fn compute_stats_combined(
        &self,
        user: &str,
        roles: &[Role],
        reporter: &dyn StatsReporter,
    ) -> DashboardStats {
        if roles.is_empty() {
            tracing::debug!("no roles requested, returning empty stats");
            return build_dashboard(&[], &[], self.config.recent_limit);
        }

        let outcomes = match fetch_with_retry(&self.config, "combined", || {
            self.store.evaluations(user)
        })
        .await
        {
            Ok(records) => group_by_role(roles, records).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e); roles.len()],
        };

        self.fold(roles, outcomes, reporter)
    }

    /// Run [`compute_stats`](Self::compute_stats) as a new generation and
    /// publish the result unless a newer one started in the meantime.
    pub async fn refresh(
        &self,
        user: &str,
        roles: &[Role],
        reporter: &dyn StatsReporter,
    ) -> RefreshOutcome {
        let generation = self.begin();
        let stats = self.compute_stats(user, roles, reporter).await;
        self.publish(generation, stats)
    }

    /// Start a new generation, superseding any in-flight attempt.
    pub fn begin(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Abandon whatever is in flight; its result will be discarded.
    pub fn invalidate(&self) {
        self.begin();
    }

    /// The current generation number.
    pub fn current_generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    /// Store `stats` if `generation` is still current.
    pub fn publish(&self, generation: Generation, stats: DashboardStats) -> RefreshOutcome {
        let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if self.current_generation() != generation {
            tracing::debug!(
                stale = generation.0,
                current = self.current_generation().0,
                "discarding superseded stats"
            );
            return RefreshOutcome::Superseded;
        }
        *slot = Some(Slot {
            generation,
            stats: stats.clone(),
        });
        RefreshOutcome::Published(stats)
    }

    /// The most recently published stats.
    pub fn latest(&self) -> Option<DashboardStats> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|slot| slot.stats.clone())
    }

    /// Generation of the most recently published stats.
    pub fn latest_generation(&self) -> Option<Generation> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|slot| slot.generation)
    }

    fn fold(
        &self,
        roles: &[Role],
        outcomes: Vec<Outcome>,
        reporter: &dyn StatsReporter,
    ) -> DashboardStats {
        let mut histories = Vec::with_capacity(roles.len());
        let mut failures = Vec::new();

        for (role, outcome) in roles.iter().zip(outcomes) {
            match outcome {
                Ok(mut records) => {
                    // per-role endpoints may omit the role fields
                    for record in &mut records {
                        if record.role_id.is_empty() {
                            record.role_id = role.id.clone();
                        }
                        if record.role_title.is_empty() {
                            record.role_title = role.title.clone();
                        }
                    }
                    let malformed: Vec<&EvaluationRecord> =
                        records.iter().filter(|r| r.is_malformed()).collect();
                    if !malformed.is_empty() {
                        for record in &malformed {
                            if let Some(defect) = record.defect {
                                tracing::warn!(
                                    role = %role.id,
                                    record = %record.id,
                                    "malformed evaluation record: {defect}"
                                );
                            }
                        }
                        reporter.on_malformed_records(role, &malformed);
                    }
                    histories.push(records);
                }
                Err(error) => {
                    failures.push(RoleFailure {
                        role_id: role.id.clone(),
                        role_title: role.title.clone(),
                        error,
                    });
                    histories.push(Vec::new());
                }
            }
        }

        if !failures.is_empty() {
            if failures.len() == roles.len() {
                tracing::error!(
                    "failed to load evaluations for all {} roles: {}",
                    roles.len(),
                    failures[0].error
                );
                reporter.on_total_failure(&failures);
            } else {
                for f in &failures {
                    tracing::warn!(role = %f.role_id, "failed to load evaluations: {}", f.error);
                }
                reporter.on_partial_failure(&failures);
            }
        }

        build_dashboard(roles, &histories, self.config.recent_limit)
    }
}

async fn with_timeout<F>(timeout: Duration, fut: F) -> Outcome
where
    F: std::future::Future<Output = Outcome>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

async fn fetch_with_retry<F, Fut>(config: &AggregatorConfig, source: &str, mut fetch: F) -> Outcome
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Outcome>,
{
    let mut delay = config.retry_delay;
    let mut attempt = 0;
    loop {
        match with_timeout(config.request_timeout, fetch()).await {
            Err(e) if !e.is_permanent() && attempt < config.max_retries => {
                attempt += 1;
                tracing::debug!(source, attempt, "retrying after transient error: {e}");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(30));
            }
            outcome => return outcome,
        }
    }
}

/// Split a combined history into one list per role, in `roles` order.
pub fn group_by_role(roles: &[Role], records: Vec<EvaluationRecord>) -> Vec<Vec<EvaluationRecord>> {
    let by_id: HashMap<&str, usize> = roles
        .iter()
        .enumerate()
        .rev()
        .map(|(i, r)| (r.id.as_str(), i))
        .collect();
    let by_title: HashMap<&str, usize> = roles
        .iter()
        .enumerate()
        .rev()
        .map(|(i, r)| (r.title.as_str(), i))
        .collect();

    let mut grouped = vec![Vec::new(); roles.len()];
    for record in records {
        let slot = by_id
            .get(record.role_id.as_str())
            .or_else(|| by_title.get(record.role_title.as_str()))
            .copied();
        match slot {
            Some(i) => grouped[i].push(record),
            None => tracing::debug!(
                record = %record.id,
                role = %record.role_id,
                "ignoring evaluation for unrequested role"
            ),
        }
    }
    grouped
}
