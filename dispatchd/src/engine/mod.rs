//! The dispatch engine: one inbound event in, zero or more outbound messages
//! out, with all durable state living in the stores.
//!
//! Control flow per unit of work: identity filter → session resolution →
//! global commands → `ACCEPT` claim routing → exactly one phase handler,
//! selected by matching on the session's [`SessionPhase`]. There is no
//! fall-through arm that silently ignores a session — a phase that cannot be
//! decoded fails loudly through the store error path instead.

mod claim;
mod intake;
mod lifecycle;

use std::sync::Arc;

use dispatch_types::{ActorIdentity, Command, InboundMessage, SessionPhase};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::messages;
use crate::store::{ProviderStore, SessionStore, StoreError, TicketStore};
use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Engine {
    sessions: SessionStore,
    tickets: TicketStore,
    providers: ProviderStore,
    transport: Arc<dyn Transport>,
    config: Config,
}

impl Engine {
    pub fn new(
        sessions: SessionStore,
        tickets: TicketStore,
        providers: ProviderStore,
        transport: Arc<dyn Transport>,
        config: Config,
    ) -> Self {
        Self {
            sessions,
            tickets,
            providers,
            transport,
            config,
        }
    }

    /// Handle one inbound transport event. Domain outcomes (including
    /// rejections) are communicated to the actor; store/transport failures
    /// are logged and answered with the generic error message. Mutations
    /// already made before a failure are not rolled back — later reads
    /// tolerate the partial state through the conditional transitions.
    pub async fn handle(&self, event: InboundMessage) {
        if event.is_group_or_status {
            debug!(sender = %event.sender, "dropping group/status traffic");
            return;
        }
        let Some(identity) = ActorIdentity::parse(&event.sender) else {
            debug!(sender = %event.sender, "dropping malformed sender");
            return;
        };

        if event.body.trim().is_empty() {
            if let Err(err) = self
                .transport
                .send(&identity, &messages::empty_body_guidance())
                .await
            {
                warn!(%identity, %err, "guidance reply failed");
            }
            return;
        }

        let body = event.body.trim().to_string();
        debug!(%identity, body = %body, "inbound");

        if let Err(err) = self.dispatch(&identity, &body).await {
            error!(%identity, %err, "unit of work failed");
            if let Err(send_err) = self
                .transport
                .send(&identity, &messages::system_error())
                .await
            {
                warn!(%identity, %send_err, "error reply failed");
            }
        }
    }

    async fn dispatch(&self, identity: &ActorIdentity, body: &str) -> Result<(), EngineError> {
        let session = self.sessions.load_or_create(identity).await?;
        self.sessions.touch(identity, body).await?;

        // Global commands and claims short-circuit every phase handler.
        match Command::parse(body) {
            Some(Command::Menu) => {
                self.sessions
                    .set_phase(identity, &SessionPhase::AwaitingIntakeType)
                    .await?;
                self.transport.send(identity, &messages::main_menu()).await?;
                return Ok(());
            }
            Some(Command::Accept { job_id }) => {
                return self.handle_claim(identity, job_id).await;
            }
            None => {}
        }

        match session.phase {
            SessionPhase::New | SessionPhase::Idle => {
                self.sessions
                    .set_phase(identity, &SessionPhase::AwaitingIntakeType)
                    .await?;
                self.transport.send(identity, &messages::welcome()).await?;
                Ok(())
            }
            SessionPhase::AwaitingIntakeType => self.handle_intake_type(identity, body).await,
            SessionPhase::AwaitingCategory => self.handle_category(identity, body).await,
            SessionPhase::AwaitingLocation { category } => {
                self.handle_location(identity, category, body).await
            }
            SessionPhase::AwaitingDesc { category, location } => {
                self.handle_description(identity, category, &location, body).await
            }
            SessionPhase::EnquiryMode => self.handle_enquiry(identity).await,
            SessionPhase::AwaitingApproval { job_id } => {
                self.handle_approval(identity, job_id, body).await
            }
            SessionPhase::VerifyingJob { job_id, reported } => {
                self.handle_verification(identity, job_id, reported, body).await
            }
            SessionPhase::ActiveJob { job_id } => {
                self.handle_completion_report(identity, job_id, body).await
            }
        }
    }
}
