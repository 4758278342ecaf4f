//! The Supervisor module manages the lifecycle of the Herald application.
//!
//! The supervisor is the top-level owner of every long-running service: the
//! event loop that drives the chain subscriptions and the rule API server.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` collects the repository, the
//!   chain client, the contract interface and the notification service.
//! - **Lifecycle Management**: `run` subscribes the stored active rules and
//!   spawns the services.
//! - **Graceful Shutdown**: On `SIGINT` or `SIGTERM` the cancellation token
//!   fires. The event loop finishes its in-flight log, cancels its
//!   subscriptions and exits; the supervisor then waits for all tasks and
//!   closes the database within `shutdown_timeout`.
//! - **Task Supervision**: If a service stops unexpectedly the supervisor
//!   shuts the others down so the process exits instead of running half
//!   functional.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    abi::ContractInterface,
    config::AppConfig,
    engine::{EventLoop, EventProcessor, NotificationRecorder, RuleMatcher},
    http_server,
    notification::NotificationService,
    persistence::{AppRepository, PersistenceError},
    providers::ChainClient,
    subscription::{SubscriptionError, SubscriptionManager, subscription_channel},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state repository was not provided to the `SupervisorBuilder`.
    #[error("Missing state repository for Supervisor")]
    MissingStateRepository,

    /// A chain client was not provided to the `SupervisorBuilder`.
    #[error("Missing chain client for Supervisor")]
    MissingChainClient,

    /// A contract interface was not provided to the `SupervisorBuilder`.
    #[error("Missing contract interface for Supervisor")]
    MissingContractInterface,

    /// A notification service was not provided to the `SupervisorBuilder`.
    #[error("Missing notification service for Supervisor")]
    MissingNotificationService,

    /// The active rules could not be loaded.
    #[error("Failed to load rules from state repository: {0}")]
    RuleLoadError(#[from] PersistenceError),

    /// The initial subscriptions could not be opened.
    #[error("Failed to start subscriptions: {0}")]
    Subscription(#[from] SubscriptionError),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// Rule and notification store.
    repo: Arc<dyn AppRepository>,

    /// Source of logs and block timestamps.
    chain: Arc<dyn ChainClient>,

    /// Events the decoder understands.
    interface: Arc<ContractInterface>,

    /// Delivers rendered notifications.
    notifier: Arc<NotificationService>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    pub fn new(
        config: AppConfig,
        repo: Arc<dyn AppRepository>,
        chain: Arc<dyn ChainClient>,
        interface: Arc<ContractInterface>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            repo,
            chain,
            interface,
            notifier,
            cancellation_token: CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts the supervisor and all its managed services and runs until
    /// shutdown.
    ///
    /// Fails before spawning anything when the active rules cannot be loaded
    /// or subscribed.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let rules = self.repo.get_active_rules().await?;
        tracing::info!(count = rules.len(), "Loaded active rules.");

        let mut manager = SubscriptionManager::new(Arc::clone(&self.chain));
        manager.start(&rules).await?;

        let (requester, commands) =
            subscription_channel(self.config.subscription_queue_capacity, self.config.subscription_backpressure);

        self.spawn_signal_handler();

        let processor = EventProcessor::new(
            Arc::clone(&self.interface),
            RuleMatcher::new(Arc::clone(&self.repo)),
            NotificationRecorder::new(Arc::clone(&self.repo), Arc::clone(&self.chain)),
            Arc::clone(&self.notifier),
        );
        let event_loop = EventLoop::new(
            manager,
            processor,
            commands,
            self.cancellation_token.clone(),
            self.config.event_processing_timeout,
        );
        let loop_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            event_loop.run().await;
            if !loop_token.is_cancelled() {
                tracing::error!("Event loop exited unexpectedly. Initiating shutdown.");
                loop_token.cancel();
            }
        });

        if self.config.server.enabled {
            let server_config = self.config.server.clone();
            let repo = Arc::clone(&self.repo);
            let token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                if let Err(e) =
                    http_server::run_server_from_config(&server_config, repo, requester, token.clone()).await
                {
                    tracing::error!(error = %e, "HTTP server failed. Initiating shutdown.");
                    token.cancel();
                }
            });
        } else {
            drop(requester);
        }

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn spawn_signal_handler(&mut self) {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => return,
            }

            cancellation_token.cancel();
        });
    }

    async fn shutdown(&mut self) {
        let shutdown_timeout = self.config.shutdown_timeout;
        tracing::info!("Waiting for supervised tasks to finish...");

        let drain = async {
            while let Some(result) = self.join_set.join_next().await {
                if let Err(e) = result {
                    tracing::error!("A task failed during shutdown: {:?}", e);
                }
            }
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!("Tasks did not finish within {:?}. Aborting them.", shutdown_timeout);
            self.join_set.shutdown().await;
        }
        tracing::info!("All supervised tasks have completed.");

        if tokio::time::timeout(shutdown_timeout, self.repo.close()).await.is_err() {
            tracing::warn!("Closing the state repository did not complete within {:?}.", shutdown_timeout);
        }

        tracing::info!("Supervisor shutdown complete.");
    }
}
