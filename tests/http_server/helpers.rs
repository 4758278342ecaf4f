use std::{net::SocketAddr, sync::Arc};

use herald::{
    http_server::{self, ApiState},
    persistence::{AppRepository, SqliteStateRepository},
    subscription::{BackpressurePolicy, SubscriptionCommand, subscription_channel},
};
use reqwest::Client;
use tokio::{sync::mpsc, task};
use tokio_util::sync::CancellationToken;

pub const API_KEY: &str = "test-key";

pub async fn create_test_repo() -> Arc<SqliteStateRepository> {
    let repo = SqliteStateRepository::new("sqlite::memory:").await.expect("Failed to create in-memory repo");
    repo.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repo)
}

pub async fn create_test_repo_without_migrations() -> Arc<SqliteStateRepository> {
    let repo = SqliteStateRepository::new("sqlite::memory:").await.expect("Failed to create in-memory repo");
    Arc::new(repo)
}

pub struct TestServer {
    pub address: SocketAddr,
    pub server_handle: task::JoinHandle<Result<(), std::io::Error>>,
    pub client: Client,
    pub commands: mpsc::Receiver<SubscriptionCommand>,
    token: CancellationToken,
}

impl TestServer {
    pub async fn new(repo: Arc<dyn AppRepository>) -> Self {
        Self::with_queue(repo, 8, BackpressurePolicy::Block).await
    }

    pub async fn with_queue(repo: Arc<dyn AppRepository>, capacity: usize, policy: BackpressurePolicy) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let address = listener.local_addr().expect("Failed to get address");

        let (subscriptions, commands) = subscription_channel(capacity, policy);
        let state = ApiState { repo, subscriptions, api_key: Some(API_KEY.to_string()) };
        let token = CancellationToken::new();
        let server_handle = task::spawn(http_server::serve(listener, state, token.clone()));

        Self { address, server_handle, client: Client::new(), commands, token }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("Request failed")
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(API_KEY)
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(API_KEY)
    }

    pub async fn cleanup(self) {
        self.token.cancel();
        self.server_handle.await.expect("Server task panicked").expect("Server failed");
    }
}
