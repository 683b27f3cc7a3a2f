//! Post-claim workflow: client approval, provider completion reporting, and
//! client verification or dispute of the reported outcome.

use dispatch_types::{
    is_affirmative, is_negative, normalize, ActorIdentity, JobId, ReportedOutcome,
    SessionPhase, TicketStatus,
};
use tracing::{info, warn};

use super::{Engine, EngineError};
use crate::messages;

impl Engine {
    /// Client in `AwaitingApproval { job_id }`. An affirmative reply seals
    /// the match and exchanges contact details; anything else returns the
    /// client to idle and leaves the ticket where it is.
    pub(super) async fn handle_approval(
        &self,
        identity: &ActorIdentity,
        job_id: JobId,
        body: &str,
    ) -> Result<(), EngineError> {
        // The approval prompt offers YES/NO only; a stray menu digit must not
        // seal a match.
        let affirmed = normalize(body).eq_ignore_ascii_case("yes");
        if !affirmed {
            // The ticket stays in PendingClientApproval: no longer claimable,
            // not reopened. External follow-up owns these.
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            warn!(job_id, client = %identity, "approval declined, ticket left pending");
            self.transport
                .send(identity, &messages::approval_declined())
                .await?;
            return Ok(());
        }

        if !self
            .tickets
            .transition(job_id, TicketStatus::PendingClientApproval, TicketStatus::Matched)
            .await?
        {
            warn!(job_id, client = %identity, "approval arrived for a ticket no longer pending");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            self.transport
                .send(identity, &messages::approval_unavailable())
                .await?;
            return Ok(());
        }

        let Some(ticket) = self.tickets.get(job_id).await? else {
            warn!(job_id, "matched ticket vanished");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            return Ok(());
        };
        let Some(provider) = ticket.awarded_provider.clone() else {
            // A ticket cannot reach Matched without a successful claim.
            warn!(job_id, "matched ticket has no awarded provider");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            return Ok(());
        };

        info!(job_id, client = %identity, provider = %provider, "match confirmed");

        self.providers.set_available(&provider, false).await?;
        self.sessions
            .set_phase(&provider, &SessionPhase::ActiveJob { job_id })
            .await?;
        self.sessions.set_phase(identity, &SessionPhase::Idle).await?;

        self.transport
            .send(
                identity,
                &messages::match_confirmed(provider.as_str(), &self.config.support_contact),
            )
            .await?;
        self.transport
            .send(&provider, &messages::job_approved(&ticket))
            .await?;
        Ok(())
    }

    /// Provider in `ActiveJob { job_id }`. Only the two closing codes move
    /// anything; everything else reprompts without touching state.
    pub(super) async fn handle_completion_report(
        &self,
        identity: &ActorIdentity,
        job_id: JobId,
        body: &str,
    ) -> Result<(), EngineError> {
        let outcome = match normalize(body).to_lowercase().as_str() {
            "1" | "completed" => ReportedOutcome::Completed,
            "2" | "cancelled" => ReportedOutcome::Cancelled,
            _ => {
                self.transport
                    .send(identity, &messages::completion_reprompt(job_id))
                    .await?;
                return Ok(());
            }
        };

        if !self.tickets.record_reported_outcome(job_id, outcome).await? {
            warn!(job_id, provider = %identity, "closing report for a ticket not matched");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            self.transport
                .send(identity, &messages::job_no_longer_active())
                .await?;
            return Ok(());
        }

        info!(job_id, provider = %identity, outcome = outcome.as_str(), "outcome reported");

        self.providers.set_available(identity, true).await?;
        self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
        self.transport
            .send(identity, &messages::report_received(job_id))
            .await?;

        let Some(ticket) = self.tickets.get(job_id).await? else {
            warn!(job_id, "reported ticket vanished before verification");
            return Ok(());
        };
        self.sessions
            .set_phase(
                &ticket.client_identity,
                &SessionPhase::VerifyingJob { job_id, reported: outcome },
            )
            .await?;
        self.transport
            .send(
                &ticket.client_identity,
                &messages::verification_prompt(job_id, outcome),
            )
            .await?;
        Ok(())
    }

    /// Client in `VerifyingJob`. Confirm seals the reported outcome; dispute
    /// parks the ticket for human follow-up; anything else reprompts.
    pub(super) async fn handle_verification(
        &self,
        identity: &ActorIdentity,
        job_id: JobId,
        reported: ReportedOutcome,
        body: &str,
    ) -> Result<(), EngineError> {
        if is_affirmative(body) {
            if !self
                .tickets
                .transition(job_id, TicketStatus::PendingVerification, reported.terminal_status())
                .await?
            {
                warn!(job_id, "verification for a ticket not pending verification");
            }
            info!(job_id, outcome = reported.as_str(), "outcome verified");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            self.transport
                .send(identity, &messages::verification_recorded(reported))
                .await?;
        } else if is_negative(body) {
            if !self
                .tickets
                .transition(job_id, TicketStatus::PendingVerification, TicketStatus::Disputed)
                .await?
            {
                warn!(job_id, "dispute for a ticket not pending verification");
            }
            info!(job_id, "outcome disputed");
            self.sessions.set_phase(identity, &SessionPhase::Idle).await?;
            self.transport
                .send(
                    identity,
                    &messages::dispute_received(&self.config.support_contact),
                )
                .await?;
        } else {
            self.transport
                .send(identity, &messages::verification_prompt(job_id, reported))
                .await?;
        }
        Ok(())
    }
}
