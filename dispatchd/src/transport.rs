use async_trait::async_trait;
use dispatch_types::ActorIdentity;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("send to {to} failed: {reason}")]
    Send { to: String, reason: String },
}

/// Outbound half of the message channel. The real transport lives in another
/// process; the engine only ever asks it to deliver text to one identity.
/// Failures are not retried here — they surface through the generic error
/// path of the unit of work that sent them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, to: &ActorIdentity, text: &str) -> Result<(), TransportError>;
}

/// Dev transport: prints outbound traffic to stdout. Pairs with the stdin
/// line loop in `main` for exercising the engine without a real channel.
pub struct StdioTransport;

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, to: &ActorIdentity, text: &str) -> Result<(), TransportError> {
        println!("→ {to}\n{text}\n");
        Ok(())
    }
}

/// Captures outbound traffic for assertions. Test-only in spirit, but lives
/// here so integration tests can use it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ActorIdentity, String)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything sent so far.
    pub async fn take(&self) -> Vec<(ActorIdentity, String)> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    /// Messages sent to one identity, without draining.
    pub async fn sent_to(&self, identity: &ActorIdentity) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == identity)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, to: &ActorIdentity, text: &str) -> Result<(), TransportError> {
        self.sent.lock().await.push((to.clone(), text.to_string()));
        Ok(())
    }
}
