//! Claim arbitration: the first-accept-wins transition. Correctness rests on
//! the ticket store's single conditional write — this module never reads the
//! ticket before deciding the winner.

use dispatch_types::{ActorIdentity, JobId, SessionPhase};
use tracing::{info, warn};

use super::{Engine, EngineError};
use crate::messages;

impl Engine {
    /// `ACCEPT <job_id>` from any session phase. Exactly one of N concurrent
    /// claims on a `Broadcasted` ticket wins; every loser, including a replay
    /// from the winner, gets the stale-claim rejection with no mutation.
    pub(super) async fn handle_claim(
        &self,
        identity: &ActorIdentity,
        job_id: Option<JobId>,
    ) -> Result<(), EngineError> {
        let Some(job_id) = job_id else {
            self.transport.send(identity, &messages::invalid_job()).await?;
            return Ok(());
        };

        if !self.tickets.claim(job_id, identity).await? {
            let reply = match self.tickets.get(job_id).await? {
                None => messages::invalid_job(),
                Some(_) => messages::already_claimed(),
            };
            self.transport.send(identity, &reply).await?;
            return Ok(());
        }

        info!(job_id, provider = %identity, "claim won");
        self.transport.send(identity, &messages::job_claimed()).await?;

        let Some(ticket) = self.tickets.get(job_id).await? else {
            // The row was just written to; its absence means external surgery.
            warn!(job_id, "claimed ticket vanished before approval request");
            return Ok(());
        };

        let profile = self.providers.display_profile(identity).await?;
        if profile.is_none() {
            warn!(job_id, provider = %identity, "winning claimant has no profile");
        }

        self.sessions
            .set_phase(&ticket.client_identity, &SessionPhase::AwaitingApproval { job_id })
            .await?;
        self.transport
            .send(
                &ticket.client_identity,
                &messages::approval_request(ticket.category.as_str(), profile.as_ref()),
            )
            .await?;
        Ok(())
    }
}
