//! The client intake funnel: menu → category → location → description, then
//! ticket creation and the broadcast fan-out. Enquiry capture also lands
//! here since it branches off the same menu.

use dispatch_types::{ActorIdentity, Category, JobTicket, SessionPhase, TicketStatus};
use tracing::{info, warn};

use super::{Engine, EngineError};
use crate::messages;

impl Engine {
    pub(super) async fn handle_intake_type(
        &self,
        identity: &ActorIdentity,
        body: &str,
    ) -> Result<(), EngineError> {
        match dispatch_types::normalize(body).as_str() {
            "1" => {
                self.sessions
                    .set_phase(identity, &SessionPhase::AwaitingCategory)
                    .await?;
                self.transport
                    .send(identity, &messages::category_prompt())
                    .await?;
            }
            "2" => {
                self.sessions
                    .set_phase(identity, &SessionPhase::EnquiryMode)
                    .await?;
                self.transport
                    .send(
                        identity,
                        &messages::enquiry_prompt(&self.config.support_contact),
                    )
                    .await?;
            }
            _ => {
                self.transport
                    .send(identity, &messages::invalid_intake_choice())
                    .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn handle_category(
        &self,
        identity: &ActorIdentity,
        body: &str,
    ) -> Result<(), EngineError> {
        match Category::from_menu_code(&dispatch_types::normalize(body)) {
            Some(category) => {
                self.sessions
                    .set_phase(identity, &SessionPhase::AwaitingLocation { category })
                    .await?;
                self.transport
                    .send(identity, &messages::location_prompt(category.as_str()))
                    .await?;
            }
            None => {
                self.transport
                    .send(identity, &messages::invalid_category_choice())
                    .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn handle_location(
        &self,
        identity: &ActorIdentity,
        category: Category,
        body: &str,
    ) -> Result<(), EngineError> {
        // Free text, captured raw. The location is a typed field on the
        // phase, so delimiters in it are just characters.
        self.sessions
            .set_phase(
                identity,
                &SessionPhase::AwaitingDesc {
                    category,
                    location: body.to_string(),
                },
            )
            .await?;
        self.transport
            .send(identity, &messages::description_prompt())
            .await?;
        Ok(())
    }

    pub(super) async fn handle_description(
        &self,
        identity: &ActorIdentity,
        category: Category,
        location: &str,
        body: &str,
    ) -> Result<(), EngineError> {
        let ticket = self
            .tickets
            .create(identity, category, location, body)
            .await?;
        info!(job_id = ticket.job_id, %category, "ticket created");

        self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
        self.transport
            .send(identity, &messages::request_received())
            .await?;

        self.broadcast(&ticket).await
    }

    /// Fan the job out to up to `broadcast_limit` eligible providers. The
    /// ticket must be persisted as `Broadcasted` before the first
    /// notification leaves, so a claim racing a slow fan-out already sees a
    /// valid precondition.
    pub(super) async fn broadcast(&self, ticket: &JobTicket) -> Result<(), EngineError> {
        let eligible = self
            .providers
            .eligible(ticket.category, self.config.broadcast_limit)
            .await?;

        if eligible.is_empty() {
            self.tickets
                .transition(
                    ticket.job_id,
                    TicketStatus::Searching,
                    TicketStatus::FailedNoArtisans,
                )
                .await?;
            info!(job_id = ticket.job_id, "no eligible providers, ticket failed");
            self.transport
                .send(
                    &ticket.client_identity,
                    &messages::no_providers(&self.config.support_contact),
                )
                .await?;
            return Ok(());
        }

        let notified: Vec<ActorIdentity> =
            eligible.iter().map(|p| p.identity.clone()).collect();

        if !self
            .tickets
            .mark_broadcasted(ticket.job_id, &notified)
            .await?
        {
            // Someone else already moved this ticket; do not double-notify.
            warn!(job_id = ticket.job_id, "broadcast precondition gone, skipping fan-out");
            return Ok(());
        }

        info!(
            job_id = ticket.job_id,
            providers = notified.len(),
            "broadcasting job"
        );
        let alert = messages::job_alert(ticket);
        for provider in &notified {
            self.transport.send(provider, &alert).await?;
        }
        Ok(())
    }

    pub(super) async fn handle_enquiry(
        &self,
        identity: &ActorIdentity,
    ) -> Result<(), EngineError> {
        // The enquiry text itself is already captured in last_message for
        // human review; acknowledge and free the session.
        self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
        self.transport
            .send(
                identity,
                &messages::enquiry_received(&self.config.support_contact),
            )
            .await?;
        Ok(())
    }
}
