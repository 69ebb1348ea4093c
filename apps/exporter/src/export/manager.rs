//! Top-level export façade: content-hash cache, per-attempt timeout, linear
//! retry and the async task queue.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::ExportError;
use crate::export::cache::{cache_key, CacheStats, ExportCache};
use crate::export::engine::RenderEngine;
use crate::export::generator::{DataValidation, ExportResult, Generator, Performance};
use crate::export::options::{ExportOptions, ExportOptionsPatch, SupportedOptions};
use crate::export::queue::{
    ExportJob, ExportQueue, ExportTask, ProgressReporter, QueueStatus, RetryPolicy, TaskProcessor,
    DEFAULT_FINISHED_RETENTION, PROGRESS_GENERATED,
};
use crate::models::ContentSnapshot;
use crate::templates::TemplateRegistry;

/// Operational settings. Changes apply to exports scheduled afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub default_options: ExportOptions,
    pub cache_enabled: bool,
    pub cache_max_size: usize,
    pub cache_ttl: Duration,
    pub max_concurrent: usize,
    /// Budget for a single attempt.
    pub timeout: Duration,
    /// Total attempts per export, including the first.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    /// Finished async tasks kept for status queries.
    pub task_retention: usize,
    pub log_level: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_options: ExportOptions::default(),
            cache_enabled: true,
            cache_max_size: 50,
            cache_ttl: Duration::from_secs(300),
            max_concurrent: 3,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            task_retention: DEFAULT_FINISHED_RETENTION,
            log_level: "info".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            base_delay: self.retry_delay,
            timeout: self.timeout,
        }
    }

    fn resolve_options(&self, patch: Option<&ExportOptionsPatch>) -> ExportOptions {
        match patch {
            Some(patch) => self.default_options.merged(patch),
            None => self.default_options.clone(),
        }
    }
}

/// Partial update for [`ManagerConfig`]; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerConfigUpdate {
    pub default_options: Option<ExportOptionsPatch>,
    pub cache_enabled: Option<bool>,
    pub cache_max_size: Option<usize>,
    pub cache_ttl_ms: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub task_retention: Option<usize>,
    pub log_level: Option<String>,
}

impl ManagerConfigUpdate {
    fn apply(&self, config: &mut ManagerConfig) {
        if let Some(patch) = &self.default_options {
            config.default_options = config.default_options.merged(patch);
        }
        if let Some(v) = self.cache_enabled {
            config.cache_enabled = v;
        }
        if let Some(v) = self.cache_max_size {
            config.cache_max_size = v;
        }
        if let Some(v) = self.cache_ttl_ms {
            config.cache_ttl = Duration::from_millis(v);
        }
        if let Some(v) = self.max_concurrent {
            config.max_concurrent = v.max(1);
        }
        if let Some(v) = self.timeout_ms {
            config.timeout = Duration::from_millis(v);
        }
        if let Some(v) = self.retry_attempts {
            config.retry_attempts = v.max(1);
        }
        if let Some(v) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = self.task_retention {
            config.task_retention = v;
        }
        if let Some(v) = &self.log_level {
            config.log_level = v.clone();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry loop
// ────────────────────────────────────────────────────────────────────────────

/// Runs generations under a [`RetryPolicy`]. Shared by the synchronous path
/// and the queue.
struct ExportRunner {
    generator: Generator,
}

impl ExportRunner {
    async fn run_with_retry(
        &self,
        snapshot: &ContentSnapshot,
        options: &ExportOptions,
        policy: RetryPolicy,
        progress: Option<&ProgressReporter>,
    ) -> ExportResult {
        let start = Utc::now();
        let started = Instant::now();
        let max_attempts = policy.attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let cancel = CancellationToken::new();
            let outcome = tokio::select! {
                res = self.generator.generate(snapshot, options, cancel.clone()) => res,
                _ = tokio::time::sleep(policy.timeout) => {
                    cancel.cancel();
                    Err(ExportError::Timeout(policy.timeout))
                }
            };

            match outcome {
                Ok(artifact) => {
                    if let Some(progress) = progress {
                        progress.report(PROGRESS_GENERATED);
                    }
                    let perf = Performance::measure(start, started);
                    info!(
                        attempt,
                        filename = %artifact.filename,
                        duration_ms = perf.duration_ms,
                        "Export succeeded"
                    );
                    return ExportResult::succeeded(artifact, perf, attempt);
                }
                Err(e) => {
                    let kind = e.kind();
                    if !kind.is_retryable() || attempt >= max_attempts {
                        error!(
                            attempt,
                            kind = kind.as_str(),
                            "Export failed after {attempt} attempt(s): {e}"
                        );
                        return ExportResult::failed(&e, Performance::measure(start, started), attempt);
                    }
                    let delay = policy.base_delay * attempt;
                    warn!(
                        attempt,
                        kind = kind.as_str(),
                        delay_ms = delay.as_millis() as u64,
                        "Export attempt failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl TaskProcessor for ExportRunner {
    async fn process(&self, job: ExportJob, progress: ProgressReporter) -> ExportResult {
        debug!(task_id = %job.task_id, attempts = job.policy.attempts, "Processing export task");
        self.run_with_retry(&job.snapshot, &job.options, job.policy, Some(&progress))
            .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Manager
// ────────────────────────────────────────────────────────────────────────────

pub struct ExportManager {
    runner: Arc<ExportRunner>,
    queue: Arc<ExportQueue>,
    cache: Arc<ExportCache>,
    config: RwLock<ManagerConfig>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ExportManager {
    /// Builds the manager. When called inside a tokio runtime a background
    /// task purges expired cache entries every half TTL.
    pub fn new(
        registry: Arc<TemplateRegistry>,
        engine: Arc<dyn RenderEngine>,
        config: ManagerConfig,
    ) -> Self {
        let runner = Arc::new(ExportRunner {
            generator: Generator::new(registry, engine),
        });
        let queue = ExportQueue::with_retention(
            runner.clone(),
            config.max_concurrent,
            config.task_retention,
        );
        let cache = Arc::new(ExportCache::new(config.cache_max_size, config.cache_ttl));

        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(sweep_expired(Arc::downgrade(&cache)))),
            Err(_) => {
                warn!("No tokio runtime; export cache relies on lazy expiry only");
                None
            }
        };

        info!(
            max_concurrent = config.max_concurrent,
            cache_enabled = config.cache_enabled,
            retry_attempts = config.retry_attempts,
            timeout_ms = config.timeout.as_millis() as u64,
            "Export manager ready"
        );

        Self {
            runner,
            queue,
            cache,
            config: RwLock::new(config),
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn config(&self) -> ManagerConfig {
        self.config.read().clone()
    }

    /// Synchronous export. Successful results are cached by content hash.
    pub async fn export_pdf(
        &self,
        snapshot: &ContentSnapshot,
        options: Option<ExportOptionsPatch>,
    ) -> ExportResult {
        let (options, policy, cache_enabled) = {
            let config = self.config.read();
            (
                config.resolve_options(options.as_ref()),
                config.retry_policy(),
                config.cache_enabled,
            )
        };

        let key = if cache_enabled {
            match cache_key(snapshot, &options) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("Export cache key unavailable: {e}");
                    None
                }
            }
        } else {
            None
        };

        if let Some(key) = &key {
            if let Some(mut hit) = self.cache.get(key) {
                info!(cache_key = %key, "Export served from cache");
                let now = Utc::now();
                hit.cached = true;
                hit.attempts = 0;
                hit.performance = Performance {
                    start: now,
                    end: now,
                    duration_ms: 0,
                };
                return hit;
            }
        }

        let result = self
            .runner
            .run_with_retry(snapshot, &options, policy, None)
            .await;

        if let (true, Some(key)) = (result.success, key) {
            debug!(cache_key = %key, "Caching export result");
            self.cache.insert(key, result.clone());
        }
        result
    }

    /// Queues an export and returns its task id. The cache is not consulted.
    pub fn export_pdf_async(
        &self,
        snapshot: ContentSnapshot,
        options: Option<ExportOptionsPatch>,
    ) -> Uuid {
        let (options, policy) = {
            let config = self.config.read();
            (config.resolve_options(options.as_ref()), config.retry_policy())
        };
        let id = self.queue.add_task(Arc::new(snapshot), options, policy);
        info!(task_id = %id, "Export task submitted");
        id
    }

    pub fn get_task_status(&self, id: Uuid) -> Option<ExportTask> {
        self.queue.get_task(id)
    }

    pub async fn wait_for_task(&self, id: Uuid) -> Result<ExportTask, ExportError> {
        self.queue.wait_for(id).await
    }

    pub fn cancel_task(&self, id: Uuid) -> bool {
        self.queue.cancel_task(id)
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        self.queue.get_queue_status()
    }

    pub fn clear_queue(&self) -> usize {
        self.queue.clear_queue()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Export cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn validate_resume_data(&self, snapshot: &ContentSnapshot) -> DataValidation {
        self.runner.generator.validate_data(snapshot)
    }

    pub fn get_supported_options(&self) -> SupportedOptions {
        SupportedOptions::new(self.runner.generator.registry().ids())
    }

    /// Tasks already queued keep the policy captured when they were added.
    pub fn update_config(&self, update: &ManagerConfigUpdate) {
        let config = {
            let mut config = self.config.write();
            update.apply(&mut config);
            config.clone()
        };
        self.cache.configure(config.cache_max_size, config.cache_ttl);
        self.queue.set_max_concurrent(config.max_concurrent);
        self.queue.set_finished_retention(config.task_retention);
        info!(
            max_concurrent = config.max_concurrent,
            cache_enabled = config.cache_enabled,
            retry_attempts = config.retry_attempts,
            "Export configuration updated"
        );
    }
}

impl Drop for ExportManager {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

async fn sweep_expired(cache: Weak<ExportCache>) {
    loop {
        let period = match cache.upgrade() {
            Some(cache) => (cache.ttl() / 2).max(Duration::from_millis(1)),
            None => break,
        };
        tokio::time::sleep(period).await;
        let Some(cache) = cache.upgrade() else {
            break;
        };
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!(purged, "Purged expired export cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, RenderError};
    use crate::export::definition::DocumentDefinition;
    use crate::export::engine::RenderSettings;
    use crate::export::queue::TaskStatus;
    use crate::models::snapshot::{ExperienceEntry, PersonalInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Fails the first `failures` calls, then returns fixed bytes.
    struct CountingEngine {
        calls: AtomicU32,
        failures: u32,
    }

    impl CountingEngine {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RenderEngine for CountingEngine {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn render(
            &self,
            _definition: Arc<DocumentDefinition>,
            _settings: RenderSettings,
            _cancel: CancellationToken,
        ) -> Result<Vec<u8>, RenderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(RenderError::Layout(format!("failure {call}")));
            }
            Ok(b"%PDF-mock".to_vec())
        }
    }

    /// Never finishes on its own; records whether it saw cancellation.
    struct HangingEngine {
        saw_cancel: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RenderEngine for HangingEngine {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn render(
            &self,
            _definition: Arc<DocumentDefinition>,
            _settings: RenderSettings,
            cancel: CancellationToken,
        ) -> Result<Vec<u8>, RenderError> {
            let saw_cancel = Arc::clone(&self.saw_cancel);
            let watcher = cancel.clone();
            tokio::spawn(async move {
                watcher.cancelled().await;
                saw_cancel.store(true, Ordering::SeqCst);
            });
            std::future::pending::<()>().await;
            Err(RenderError::Cancelled)
        }
    }

    fn config() -> ManagerConfig {
        ManagerConfig {
            retry_attempts: 3,
            retry_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
            ..Default::default()
        }
    }

    fn manager(engine: Arc<dyn RenderEngine>, config: ManagerConfig) -> ExportManager {
        ExportManager::new(
            Arc::new(TemplateRegistry::with_builtin_templates()),
            engine,
            config,
        )
    }

    fn snapshot() -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Grace Hopper".into(),
                email: "grace@example.com".into(),
                ..Default::default()
            },
            experience: vec![ExperienceEntry {
                id: "1".into(),
                company: "US Navy".into(),
                position: "Rear Admiral".into(),
                start_date: "1943-12".into(),
                end_date: Some("1986-08".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_exports_render_once_until_cache_cleared() {
        let engine = CountingEngine::new(0);
        let mgr = manager(engine.clone(), config());

        let first = mgr.export_pdf(&snapshot(), None).await;
        assert!(first.success);
        assert!(!first.cached);
        let second = mgr.export_pdf(&snapshot(), None).await;
        assert!(second.success);
        assert!(second.cached);
        assert_eq!(second.payload, first.payload);
        assert_eq!(engine.calls(), 1);

        mgr.clear_cache();
        let third = mgr.export_pdf(&snapshot(), None).await;
        assert!(!third.cached);
        assert_eq!(engine.calls(), 2);

        let stats = mgr.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_options_miss_cache() {
        let engine = CountingEngine::new(0);
        let mgr = manager(engine.clone(), config());
        mgr.export_pdf(&snapshot(), None).await;
        let patch = ExportOptionsPatch {
            template_id: Some("classic".into()),
            ..Default::default()
        };
        let other = mgr.export_pdf(&snapshot(), Some(patch)).await;
        assert!(!other.cached);
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_last_attempt() {
        let engine = CountingEngine::new(2);
        let mgr = manager(engine.clone(), config());
        let result = mgr.export_pdf(&snapshot(), None).await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.attempts, 3);
        assert_eq!(engine.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_with_last_error() {
        let engine = CountingEngine::new(10);
        let mgr = manager(engine.clone(), config());
        let result = mgr.export_pdf(&snapshot(), None).await;
        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.error_kind(), Some(ErrorKind::Rendering));
        assert!(result.errors[0].message.contains("failure 3"));
        assert_eq!(mgr.cache_stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_is_linear() {
        let engine = CountingEngine::new(10);
        let mgr = manager(engine, config());
        let before = tokio::time::Instant::now();
        mgr.export_pdf(&snapshot(), None).await;
        // 100ms after attempt 1, 200ms after attempt 2.
        let waited = before.elapsed();
        assert!(waited >= Duration::from_millis(300), "{waited:?}");
        assert!(waited < Duration::from_millis(310), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_data_is_not_retried() {
        let engine = CountingEngine::new(0);
        let mgr = manager(engine.clone(), config());
        let mut bad = snapshot();
        bad.personal_info.email = "nope".into();
        let result = mgr.export_pdf(&bad, None).await;
        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_time_out_and_cancel_render() {
        let saw_cancel = Arc::new(AtomicBool::new(false));
        let engine = Arc::new(HangingEngine {
            saw_cancel: Arc::clone(&saw_cancel),
        });
        let mgr = manager(
            engine,
            ManagerConfig {
                retry_attempts: 2,
                ..config()
            },
        );
        let result = mgr.export_pdf(&snapshot(), None).await;
        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        tokio::task::yield_now().await;
        assert!(saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_entry_expires_after_ttl() {
        let engine = CountingEngine::new(0);
        let mgr = manager(engine.clone(), config());
        mgr.export_pdf(&snapshot(), None).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        let again = mgr.export_pdf(&snapshot(), None).await;
        assert!(!again.cached);
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_purges_without_lookup() {
        let engine = CountingEngine::new(0);
        let mgr = manager(
            engine,
            ManagerConfig {
                cache_ttl: Duration::from_secs(10),
                ..config()
            },
        );
        mgr.export_pdf(&snapshot(), None).await;
        assert_eq!(mgr.cache_stats().entries, 1);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(mgr.cache_stats().entries, 0);
        assert_eq!(mgr.cache_stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_export_completes() {
        let engine = CountingEngine::new(1);
        let mgr = manager(engine, config());
        let id = mgr.export_pdf_async(snapshot(), None);
        let task = mgr.wait_for_task(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        let result = task.result.unwrap();
        assert_eq!(result.attempts, 2);
        assert!(result.filename.unwrap().starts_with("Grace_Hopper_resume_"));
        assert_eq!(mgr.get_queue_status().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_config_applies_to_new_tasks_only() {
        let engine = CountingEngine::new(10);
        let mgr = manager(
            engine,
            ManagerConfig {
                max_concurrent: 1,
                ..config()
            },
        );
        let running = mgr.export_pdf_async(snapshot(), None);
        mgr.update_config(&ManagerConfigUpdate {
            retry_attempts: Some(1),
            max_concurrent: Some(2),
            ..Default::default()
        });
        let later = mgr.export_pdf_async(snapshot(), None);

        assert_eq!(mgr.get_queue_status().max_concurrent, 2);
        let first = mgr.wait_for_task(running).await.unwrap();
        let second = mgr.wait_for_task(later).await.unwrap();
        assert_eq!(first.result.unwrap().attempts, 3);
        assert_eq!(second.result.unwrap().attempts, 1);
        assert_eq!(second.error.unwrap().kind, ErrorKind::Rendering);
    }

    #[tokio::test]
    async fn test_supported_options_lists_templates() {
        let mgr = manager(CountingEngine::new(0), config());
        let supported = mgr.get_supported_options();
        assert!(supported.templates.contains(&"modern".to_string()));
        assert_eq!(supported.outputs.len(), 4);
        assert!(!mgr.validate_resume_data(&ContentSnapshot::default()).is_valid);
    }
}
