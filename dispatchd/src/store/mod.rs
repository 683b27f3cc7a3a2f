mod provider_store;
mod session_store;
mod ticket_store;

pub use provider_store::ProviderStore;
pub use session_store::SessionStore;
pub use ticket_store::TicketStore;

use dispatch_types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted session phase that no longer decodes. Surfaced as an
    /// explicit error instead of silently skipping the actor's message.
    #[error("corrupt session phase for {identity}: {source}")]
    CorruptPhase {
        identity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt stored value: {0}")]
    CorruptColumn(#[from] dispatch_types::ParseError),

    #[error("corrupt notified-providers list on job {job_id}: {source}")]
    CorruptProviderList {
        job_id: JobId,
        #[source]
        source: serde_json::Error,
    },
}
