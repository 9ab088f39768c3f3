// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway assembly and lifecycle.
//!
//! Everything is wired through this one explicit context — no module
//! globals. The only process-wide state lives in the task store, the
//! dashboard, and the tracker's live-task map, all owned here.

use crate::config::{ConfigFile, GatewayConfig};
use crate::http::{build_router, AppState};
use fs2::FileExt;
use gofer_adapters::{DeliveryTarget, EgressError, SendMessage};
use gofer_core::SystemClock;
use gofer_engine::{RunnerConfig, Scheduler, SchedulerConfig, TaskRunner};
use gofer_storage::{SnapshotStore, TaskStore, TaskStoreConfig};
use gofer_supervisor::{
    SessionError, SessionRequest, SessionSupervisor, SessionUpdate, SupervisorConfig,
};
use gofer_tracker::{DashboardState, DashboardStore, ProgressTracker, TrackerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Cadence of the tracker's orphan sweep.
const ORPHAN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Daemon launch options (from flags).
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Directory for all persistent state (stores, logs, lock).
    pub state_dir: PathBuf,
    /// Override for the configured HTTP bind address.
    pub http_addr: Option<String>,
    /// Override for the config document path.
    pub config_path: Option<PathBuf>,
}

/// Egress stand-in used when no chat adapter is attached: deliveries go
/// to the log. The real adapter is injected by the embedding process.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEgress;

#[async_trait::async_trait]
impl SendMessage for LogEgress {
    async fn send_message(&self, target: &DeliveryTarget, text: &str) -> Result<(), EgressError> {
        tracing::info!(%target, %text, "chat egress (no adapter attached)");
        Ok(())
    }
}

/// Fully wired gateway process.
pub struct Gateway {
    config: GatewayConfig,
    app_state: AppState,
    scheduler: Scheduler,
    dashboard_store: Arc<DashboardStore>,
    tracker: ProgressTracker,
    supervisor: Arc<SessionSupervisor>,
    updates_rx: Option<mpsc::Receiver<SessionUpdate>>,
    shutdown: Arc<Notify>,
    /// Held for the process lifetime; released on drop.
    _lock: std::fs::File,
}

impl Gateway {
    /// Assemble every component from the state directory and config.
    pub fn build(
        options: GatewayOptions,
        egress: Arc<dyn SendMessage>,
    ) -> anyhow::Result<Gateway> {
        std::fs::create_dir_all(&options.state_dir)?;

        // One gateway per state dir.
        let lock_path = options.state_dir.join("goferd.lock");
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "another gateway already owns {} (lock {})",
                options.state_dir.display(),
                lock_path.display()
            )
        })?;

        let config_path = options
            .config_path
            .clone()
            .unwrap_or_else(|| options.state_dir.join("gateway-config.json"));
        let config_file = ConfigFile::new(config_path);
        let mut config = config_file.load()?;
        if let Some(addr) = &options.http_addr {
            config.http_addr = addr.clone();
        }

        let store = Arc::new(TaskStore::open(TaskStoreConfig {
            path: options.state_dir.join("tasks.json"),
            max_history: config.max_history,
        }));
        let runner = Arc::new(TaskRunner::new(RunnerConfig {
            cli_path: config.cli_path.clone(),
            skip_permissions: config.skip_permissions,
            task_timeout_ms: config.task_timeout_ms,
            max_output_bytes: config.max_result_file_size,
            result_dir: config.result_dir.clone(),
        }));
        let scheduler = Scheduler::new(
            SchedulerConfig {
                heartbeat_interval_ms: config.heartbeat_interval_ms,
                max_concurrent: config.max_concurrent,
                ..SchedulerConfig::default()
            },
            Arc::clone(&store),
            runner,
            Arc::clone(&egress),
            SystemClock,
        );

        let dashboard = Arc::new(DashboardState::new(SystemClock));
        let dashboard_store = Arc::new(DashboardStore::new(
            Arc::clone(&dashboard),
            SnapshotStore::new(options.state_dir.join("dashboard-state.json")),
            config.auto_snapshot_interval_ms,
        ));
        let tracker = ProgressTracker::new(
            TrackerConfig {
                smart_trigger_interval_ms: config.smart_trigger_interval_ms,
                ..TrackerConfig::default()
            },
            Arc::clone(&dashboard),
            Arc::clone(&egress),
            SystemClock,
        );

        let (updates_tx, updates_rx) = mpsc::channel(1_024);
        let supervisor = Arc::new(SessionSupervisor::new(
            SupervisorConfig {
                cli_path: config.cli_path.clone(),
                skip_permissions: config.skip_permissions,
                timeout_ms: config.session_timeout_ms,
                ..SupervisorConfig::default()
            },
            updates_tx,
        ));

        let shutdown = Arc::new(Notify::new());
        let restart_signal = Arc::clone(&shutdown);
        let app_state = AppState {
            scheduler: scheduler.clone(),
            store,
            dashboard,
            config_file,
            restart: Arc::new(move || restart_signal.notify_one()),
            log_path: Some(options.state_dir.join("logs").join("goferd.log")),
            static_root: config.static_root.clone(),
        };

        Ok(Gateway {
            config,
            app_state,
            scheduler,
            dashboard_store,
            tracker,
            supervisor,
            updates_rx: Some(updates_rx),
            shutdown,
            _lock: lock,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    /// Start the background machinery: snapshot restore + cadence,
    /// scheduler heartbeat, progress pump, orphan sweep.
    pub fn start(&mut self) {
        self.dashboard_store.start();
        self.scheduler.start();

        if let Some(mut updates_rx) = self.updates_rx.take() {
            let tracker = self.tracker.clone();
            tokio::spawn(async move {
                while let Some(update) = updates_rx.recv().await {
                    tracker.on_progress(update.request_id.as_str(), &update.chunk).await;
                }
            });
        }

        let tracker = self.tracker.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(ORPHAN_SWEEP_INTERVAL).await;
                let reaped = tracker.cleanup_zombie_tasks();
                if reaped > 0 {
                    tracing::warn!(reaped, "orphan sweep healed tasks");
                }
            }
        });
    }

    /// Entry point for the chat boundary: run one prompt through the
    /// supervisor with full progress tracking.
    pub async fn handle_chat_request(
        &self,
        user_id: &str,
        group_id: Option<String>,
        prompt: &str,
    ) -> Result<String, SessionError> {
        let request = SessionRequest::new(user_id, group_id.clone(), prompt);
        let task_id = request.request_id.clone();
        self.tracker.start_task(task_id.as_str(), user_id, group_id, prompt);

        match self.supervisor.execute(request).await {
            Ok(output) => {
                self.tracker.end_task(task_id.as_str(), &output);
                Ok(output)
            }
            Err(error) => {
                self.tracker.fail_task(task_id.as_str(), &error.to_string());
                Err(error)
            }
        }
    }

    /// Serve the control plane until ctrl-c or a restart request, then
    /// shut the machinery down gracefully.
    pub async fn serve(mut self) -> anyhow::Result<()> {
        self.start();
        let addr = self.config.http_addr.clone();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "control plane listening");

        let router = build_router(self.app_state.clone());
        let shutdown = Arc::clone(&self.shutdown);
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("ctrl-c received"),
                _ = shutdown.notified() => tracing::info!("shutdown requested"),
            }
        });
        serve.await?;

        tracing::info!("draining scheduler");
        self.scheduler.stop().await;
        self.supervisor.cleanup();
        self.dashboard_store.shutdown();
        tracing::info!("gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
