use tokio::sync::mpsc::{self, error::TrySendError};

use super::{BackpressurePolicy, SubscriptionCommand, SubscriptionError};

/// Creates the bounded queue between request producers and the event loop.
pub fn subscription_channel(
    capacity: usize,
    policy: BackpressurePolicy,
) -> (SubscriptionRequester, mpsc::Receiver<SubscriptionCommand>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (SubscriptionRequester { sender, policy }, receiver)
}

/// Sends [`SubscriptionCommand`]s to the event loop, applying the configured
/// [`BackpressurePolicy`] to `Add` when the queue is full. `Remove` always
/// waits for capacity so a deleted rule's subscription is never left open.
#[derive(Debug, Clone)]
pub struct SubscriptionRequester {
    sender: mpsc::Sender<SubscriptionCommand>,
    policy: BackpressurePolicy,
}

impl SubscriptionRequester {
    /// Queues `command`.
    pub async fn request(&self, command: SubscriptionCommand) -> Result<(), SubscriptionError> {
        let may_reject = self.policy == BackpressurePolicy::Reject && matches!(command, SubscriptionCommand::Add(_));
        if !may_reject {
            return self.sender.send(command).await.map_err(|_| SubscriptionError::QueueClosed);
        }
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::warn!("Subscription request rejected, queue is full.");
                SubscriptionError::QueueFull
            }
            TrySendError::Closed(_) => SubscriptionError::QueueClosed,
        })
    }

    /// The configured policy.
    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }
}
