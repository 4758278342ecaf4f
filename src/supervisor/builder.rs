//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use super::{Supervisor, SupervisorError};
use crate::{
    abi::ContractInterface, config::AppConfig, notification::NotificationService, persistence::AppRepository,
    providers::ChainClient,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    repo: Option<Arc<dyn AppRepository>>,
    chain: Option<Arc<dyn ChainClient>>,
    interface: Option<Arc<ContractInterface>>,
    notifier: Option<Arc<NotificationService>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state repository (database connection) for the `Supervisor`.
    pub fn repository(mut self, repo: Arc<dyn AppRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Sets the chain client logs and block timestamps are read from.
    pub fn chain_client(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the contract interface used to decode logs.
    pub fn contract_interface(mut self, interface: Arc<ContractInterface>) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Sets the notification service.
    pub fn notification_service(mut self, notifier: Arc<NotificationService>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let repo = self.repo.ok_or(SupervisorError::MissingStateRepository)?;
        let chain = self.chain.ok_or(SupervisorError::MissingChainClient)?;
        let interface = self.interface.ok_or(SupervisorError::MissingContractInterface)?;
        let notifier = self.notifier.ok_or(SupervisorError::MissingNotificationService)?;

        tracing::debug!(events = interface.len(), "Supervisor assembled.");
        Ok(Supervisor::new(config, repo, chain, interface, notifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        persistence::traits::MockAppRepository,
        supervisor::tests::test_config,
        test_helpers::{FakeChainClient, erc20_interface},
    };

    fn complete() -> SupervisorBuilder {
        SupervisorBuilder::new()
            .config(test_config())
            .repository(Arc::new(MockAppRepository::new()))
            .chain_client(Arc::new(FakeChainClient::new()))
            .contract_interface(Arc::new(erc20_interface()))
            .notification_service(Arc::new(NotificationService::with_channels([])))
    }

    #[test]
    fn build_succeeds_with_all_components() {
        assert!(complete().build().is_ok());
    }

    #[test]
    fn build_fails_if_config_is_missing() {
        let builder = SupervisorBuilder { config: None, ..complete() };
        assert!(matches!(builder.build(), Err(SupervisorError::MissingConfig)));
    }

    #[test]
    fn build_fails_if_state_repository_is_missing() {
        let builder = SupervisorBuilder { repo: None, ..complete() };
        assert!(matches!(builder.build(), Err(SupervisorError::MissingStateRepository)));
    }

    #[test]
    fn build_fails_if_chain_client_is_missing() {
        let builder = SupervisorBuilder { chain: None, ..complete() };
        assert!(matches!(builder.build(), Err(SupervisorError::MissingChainClient)));
    }

    #[test]
    fn build_fails_if_contract_interface_is_missing() {
        let builder = SupervisorBuilder { interface: None, ..complete() };
        assert!(matches!(builder.build(), Err(SupervisorError::MissingContractInterface)));
    }

    #[test]
    fn build_fails_if_notification_service_is_missing() {
        let builder = SupervisorBuilder { notifier: None, ..complete() };
        assert!(matches!(builder.build(), Err(SupervisorError::MissingNotificationService)));
    }
}
