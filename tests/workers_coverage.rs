mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::sync::broadcast;

use common::fixtures::{seed_trash_file, seed_user};
use common::TestEnv;
use trash_expiry::config::{Config, TrashbinConfig, WorkerConfig};
use trash_expiry::constants::USER_OFFSET_CHECKPOINT;
use trash_expiry::workers::{self, expire_trash, TimedJob, WorkerName};

fn config_for(env: &TestEnv, obligation: &str, interval_secs: u64) -> Config {
    Config {
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: String::new(),
        data_dir: env.data_dir().to_string_lossy().into_owned(),
        worker: WorkerConfig {
            is_leader: true,
            enable_expire_trash: true,
            expire_trash_interval_secs: interval_secs,
            timeout_secs: 30,
        },
        trashbin: TrashbinConfig {
            retention_obligation: obligation.to_string(),
        },
    }
}

#[tokio::test]
async fn it_worker_manager_registers_jobs_and_waits_for_shutdown() {
    let env = TestEnv::new();
    let config = config_for(&env, "auto, 30", 1800);
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let manager = workers::WorkerManager::new(shutdown_tx.subscribe(), &config.worker)
        .register(expire_trash::from_config(env.store.clone(), &config));
    let jobs = manager.planned_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, WorkerName::ExpireTrash);
    assert_eq!(jobs[0].interval, StdDuration::from_secs(1800));
    assert!(jobs[0].enabled);

    let mut disabled = config.worker.clone();
    disabled.enable_expire_trash = false;
    let manager_disabled = workers::WorkerManager::new(shutdown_tx.subscribe(), &disabled)
        .register(expire_trash::from_config(env.store.clone(), &config));
    assert!(manager_disabled.planned_jobs().iter().all(|j| !j.enabled));

    let start_outcome = tokio::time::timeout(StdDuration::from_secs(2), manager.start()).await;
    assert!(
        start_outcome.is_err(),
        "leader worker manager start should wait for shutdown signal"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn it_scheduled_sweep_expires_trash() {
    let env = TestEnv::new();
    let config = config_for(&env, "auto, 7", 1);
    let now = Utc::now();
    seed_user(&env.store, "alice", Some(now));
    let item = seed_trash_file(env.data_dir(), "alice", "old.txt", now - Duration::days(10), b"x");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let manager = workers::WorkerManager::new(shutdown_tx.subscribe(), &config.worker)
        .register(expire_trash::from_config(env.store.clone(), &config));
    let handle = tokio::spawn(manager.start());

    let deadline = tokio::time::Instant::now() + StdDuration::from_secs(10);
    while item.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(StdDuration::from_millis(100)).await;
    }

    let _ = shutdown_tx.send(());
    handle.abort();
    assert!(!item.exists(), "scheduled sweep should remove the expired item");
    assert!(env.store.get_checkpoint(USER_OFFSET_CHECKPOINT).unwrap() > 0);
}

#[tokio::test]
async fn it_invoke_runs_sweep_on_blocking_pool() {
    let env = TestEnv::new();
    let config = config_for(&env, "auto, 7", 1800);
    let now = Utc::now();
    seed_user(&env.store, "bob", Some(now));
    let item = seed_trash_file(env.data_dir(), "bob", "old.txt", now - Duration::days(8), b"x");

    let job = workers::shared(expire_trash::from_config(env.store.clone(), &config));
    workers::invoke(WorkerName::ExpireTrash, job.clone(), serde_json::Value::Null).await;

    assert!(!item.exists());
    assert_eq!(env.store.get_checkpoint(USER_OFFSET_CHECKPOINT).unwrap(), 1000);

    // second run wraps since only one user exists
    workers::invoke(WorkerName::ExpireTrash, job, serde_json::Value::Null).await;
    assert_eq!(env.store.get_checkpoint(USER_OFFSET_CHECKPOINT).unwrap(), 0);
}

#[test]
fn disabled_obligation_job_is_still_schedulable() {
    let env = TestEnv::new();
    let config = config_for(&env, "disabled", 60);
    let mut job = expire_trash::from_config(env.store.clone(), &config);

    assert_eq!(job.name(), WorkerName::ExpireTrash);
    assert_eq!(job.interval(), StdDuration::from_secs(60));
    job.run(&serde_json::Value::Null).expect("disabled run is a no-op");
    assert_eq!(env.store.get_checkpoint(USER_OFFSET_CHECKPOINT).unwrap(), 0);
}
