pub mod expire_trash;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::sweep::SweepError;

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    ExpireTrash,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpireTrash => "expire_trash",
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Sweep(#[from] SweepError),
}

/// A task the scheduler runs every `interval`.
///
/// `run` receives the opaque argument the job was registered with and must
/// not assume it is the only invocation running against shared state.
pub trait TimedJob: Send {
    fn name(&self) -> WorkerName;

    fn interval(&self) -> Duration;

    fn run(&mut self, argument: &serde_json::Value) -> Result<(), JobError>;
}

pub type SharedJob = Arc<Mutex<Box<dyn TimedJob>>>;

pub fn shared(job: impl TimedJob + 'static) -> SharedJob {
    let boxed: Box<dyn TimedJob> = Box::new(job);
    Arc::new(Mutex::new(boxed))
}

struct RegisteredJob {
    name: WorkerName,
    interval: Duration,
    argument: serde_json::Value,
    job: SharedJob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub interval: Duration,
    pub enabled: bool,
}

pub struct WorkerManager {
    jobs: Vec<RegisteredJob>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(shutdown_rx: broadcast::Receiver<()>, config: &WorkerConfig) -> Self {
        Self {
            jobs: Vec::new(),
            shutdown_rx,
            config: config.clone(),
        }
    }

    pub fn register(mut self, job: impl TimedJob + 'static) -> Self {
        self.jobs.push(RegisteredJob {
            name: job.name(),
            interval: job.interval(),
            argument: serde_json::Value::Null,
            job: shared(job),
        });
        self
    }

    fn is_enabled(&self, name: WorkerName) -> bool {
        match name {
            WorkerName::ExpireTrash => self.config.enable_expire_trash,
        }
    }

    /// Single source of truth for the jobs this process schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        self.jobs
            .iter()
            .map(|job| JobSpec {
                name: job.name,
                interval: job.interval,
                enabled: self.is_enabled(job.name),
            })
            .collect()
    }

    /// Start the scheduler and block until shutdown is signalled.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        for registered in &self.jobs {
            let name = registered.name;
            if !self.is_enabled(name) {
                tracing::info!(name = name.as_str(), "Skipping disabled worker");
                continue;
            }

            let job = registered.job.clone();
            let argument = registered.argument.clone();
            add_job(scheduler, registered.interval, timeout, name, move |in_flight| {
                run_blocking(name, job.clone(), argument.clone(), Some(in_flight))
            })
            .await;
            tracing::info!(
                name = name.as_str(),
                interval_secs = registered.interval.as_secs(),
                "Registered worker"
            );
        }
    }
}

/// Clears the overlap flag once the run that set it is finished.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run one invocation on the blocking pool; job stores and trash bins do blocking I/O.
pub async fn invoke(name: WorkerName, job: SharedJob, argument: serde_json::Value) {
    run_blocking(name, job, argument, None).await
}

async fn run_blocking(
    name: WorkerName,
    job: SharedJob,
    argument: serde_json::Value,
    in_flight: Option<InFlight>,
) {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("worker", worker = name.as_str(), %run_id);

    let outcome = tokio::task::spawn_blocking(move || {
        let _in_flight = in_flight;
        let _entered = span.enter();
        let mut job = job.lock().unwrap_or_else(|e| e.into_inner());
        job.run(&argument)
    })
    .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(worker = name.as_str(), %run_id, error = %e, "Worker run failed"),
        Err(e) => tracing::error!(worker = name.as_str(), %run_id, error = %e, "Worker task panicked"),
    }
}

type Tick = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Start one scheduled run unless the previous one is still in flight.
fn start_tick<Fut, F>(
    running: &Arc<AtomicBool>,
    timeout: Duration,
    worker: &'static str,
    run: &mut F,
) -> Tick
where
    F: FnMut(InFlight) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    if running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        tracing::warn!(
            worker,
            "Skipping worker invocation: previous run still in progress"
        );
        return Box::pin(async {});
    }

    let fut = run(InFlight(running.clone()));
    Box::pin(async move {
        // A timed-out run keeps its blocking thread and the overlap flag until it returns.
        if tokio::time::timeout(timeout, fut).await.is_err() {
            tracing::error!(
                worker,
                timeout_secs = timeout.as_secs(),
                "Worker timed out"
            );
        }
    })
}

/// Add a repeating job with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(
    scheduler: &JobScheduler,
    interval: Duration,
    timeout: Duration,
    name: WorkerName,
    mut run: F,
) where
    F: FnMut(InFlight) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));
    let worker = name.as_str();

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        start_tick(&running, timeout, worker, &mut run)
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error = %err, worker, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error = %err, worker, "Failed to create worker job"),
    }
}
