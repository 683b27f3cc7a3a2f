use chrono::{DateTime, Utc};
use dispatch_types::{
    ActorIdentity, Category, JobId, JobTicket, ReportedOutcome, TicketStatus,
};
use sqlx::SqlitePool;

use super::StoreError;

#[derive(sqlx::FromRow)]
struct TicketRow {
    job_id: i64,
    client_identity: String,
    category: String,
    location: String,
    description: String,
    status: String,
    reported_outcome: Option<String>,
    notified_providers: String,
    awarded_provider: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const TICKET_COLUMNS: &str = "job_id, client_identity, category, location, description, \
     status, reported_outcome, notified_providers, awarded_provider, created_at, updated_at";

/// SQLite-backed job ticket store.
///
/// Every status change is a conditional write (`UPDATE … WHERE status = ?`)
/// judged by `rows_affected`, so racing units of work can never both move the
/// same ticket. The claim transition additionally writes `awarded_provider`
/// in the same statement, which is what makes first-accept-wins atomic.
#[derive(Debug, Clone)]
pub struct TicketStore {
    pool: SqlitePool,
}

impl TicketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the job_tickets table if it does not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS job_tickets (
                job_id             INTEGER PRIMARY KEY AUTOINCREMENT,
                client_identity    TEXT NOT NULL,
                category           TEXT NOT NULL,
                location           TEXT NOT NULL,
                description        TEXT NOT NULL,
                status             TEXT NOT NULL,
                reported_outcome   TEXT,
                notified_providers TEXT NOT NULL DEFAULT '[]',
                awarded_provider   TEXT,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS tickets_status ON job_tickets (status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Open a new ticket in `Searching` for a finished intake funnel.
    pub async fn create(
        &self,
        client: &ActorIdentity,
        category: Category,
        location: &str,
        description: &str,
    ) -> Result<JobTicket, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO job_tickets
                (client_identity, category, location, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(client.as_str())
        .bind(category.as_str())
        .bind(location)
        .bind(description)
        .bind(TicketStatus::Searching.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let job_id = result.last_insert_rowid();
        self.get(job_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<JobTicket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM job_tickets WHERE job_id = ?");
        let row: Option<TicketRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(map_row).transpose()
    }

    /// The claim arbitration primitive: award the ticket to `provider` iff it
    /// is still `Broadcasted`. Status and `awarded_provider` move in one
    /// statement; exactly one of N concurrent claims can see a row update.
    /// Returns false (no mutation) for every loser, including a replay from
    /// the winner.
    pub async fn claim(
        &self,
        job_id: JobId,
        provider: &ActorIdentity,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE job_tickets
             SET status = ?, awarded_provider = ?, updated_at = ?
             WHERE job_id = ? AND status = ?",
        )
        .bind(TicketStatus::PendingClientApproval.as_str())
        .bind(provider.as_str())
        .bind(Utc::now())
        .bind(job_id)
        .bind(TicketStatus::Broadcasted.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Move a `Searching` ticket to `Broadcasted`, recording who was offered
    /// the job. Persisted before any notification goes out so a claim racing
    /// the fan-out already sees a valid precondition.
    pub async fn mark_broadcasted(
        &self,
        job_id: JobId,
        notified: &[ActorIdentity],
    ) -> Result<bool, StoreError> {
        let notified_json =
            serde_json::to_string(notified).map_err(|source| StoreError::CorruptProviderList {
                job_id,
                source,
            })?;

        let rows = sqlx::query(
            "UPDATE job_tickets
             SET status = ?, notified_providers = ?, updated_at = ?
             WHERE job_id = ? AND status = ?",
        )
        .bind(TicketStatus::Broadcasted.as_str())
        .bind(&notified_json)
        .bind(Utc::now())
        .bind(job_id)
        .bind(TicketStatus::Searching.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Record a provider's closing report: `Matched → PendingVerification`
    /// with the reported outcome alongside.
    pub async fn record_reported_outcome(
        &self,
        job_id: JobId,
        outcome: ReportedOutcome,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE job_tickets
             SET status = ?, reported_outcome = ?, updated_at = ?
             WHERE job_id = ? AND status = ?",
        )
        .bind(TicketStatus::PendingVerification.as_str())
        .bind(outcome.as_str())
        .bind(Utc::now())
        .bind(job_id)
        .bind(TicketStatus::Matched.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Generic conditional transition for the remaining edges of the ticket
    /// state machine. Returns false without mutation when the ticket is no
    /// longer in `from`.
    pub async fn transition(
        &self,
        job_id: JobId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE job_tickets SET status = ?, updated_at = ? WHERE job_id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(job_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }
}

fn map_row(row: TicketRow) -> Result<JobTicket, StoreError> {
    let notified_providers: Vec<ActorIdentity> = serde_json::from_str(&row.notified_providers)
        .map_err(|source| StoreError::CorruptProviderList {
            job_id: row.job_id,
            source,
        })?;

    Ok(JobTicket {
        job_id: row.job_id,
        client_identity: ActorIdentity(row.client_identity),
        category: row.category.parse()?,
        location: row.location,
        description: row.description,
        status: row.status.parse()?,
        reported_outcome: row.reported_outcome.map(|s| s.parse()).transpose()?,
        notified_providers,
        awarded_provider: row.awarded_provider.map(ActorIdentity),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> TicketStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = TicketStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn identity(raw: &str) -> ActorIdentity {
        ActorIdentity::parse(raw).unwrap()
    }

    async fn broadcasted_ticket(store: &TicketStore) -> JobTicket {
        let ticket = store
            .create(
                &identity("client@c.us"),
                Category::Electrical,
                "Block A",
                "Sparking socket",
            )
            .await
            .unwrap();
        assert!(store
            .mark_broadcasted(ticket.job_id, &[identity("p1@c.us"), identity("p2@c.us")])
            .await
            .unwrap());
        store.get(ticket.job_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn second_claim_loses_and_mutates_nothing() {
        let store = store().await;
        let ticket = broadcasted_ticket(&store).await;

        assert!(store.claim(ticket.job_id, &identity("p1@c.us")).await.unwrap());
        assert!(!store.claim(ticket.job_id, &identity("p2@c.us")).await.unwrap());
        // Replay from the winner is rejected the same way.
        assert!(!store.claim(ticket.job_id, &identity("p1@c.us")).await.unwrap());

        let after = store.get(ticket.job_id).await.unwrap().unwrap();
        assert_eq!(after.status, TicketStatus::PendingClientApproval);
        assert_eq!(after.awarded_provider, Some(identity("p1@c.us")));
    }

    #[tokio::test]
    async fn searching_only_exits_through_broadcast_edges() {
        let store = store().await;
        let ticket = store
            .create(&identity("c@c.us"), Category::Plumbing, "Hostel 3", "Leak")
            .await
            .unwrap();

        // A claim against a ticket that was never broadcast must fail.
        assert!(!store.claim(ticket.job_id, &identity("p@c.us")).await.unwrap());
        assert!(store
            .transition(ticket.job_id, TicketStatus::Searching, TicketStatus::FailedNoArtisans)
            .await
            .unwrap());

        let after = store.get(ticket.job_id).await.unwrap().unwrap();
        assert_eq!(after.status, TicketStatus::FailedNoArtisans);
        assert_eq!(after.awarded_provider, None);
    }

    #[tokio::test]
    async fn terminal_tickets_reject_claims_and_stale_transitions() {
        let store = store().await;
        let ticket = store
            .create(&identity("c@c.us"), Category::Carpentry, "Block B", "Loose hinge")
            .await
            .unwrap();
        store
            .transition(ticket.job_id, TicketStatus::Searching, TicketStatus::FailedNoArtisans)
            .await
            .unwrap();

        let after = store.get(ticket.job_id).await.unwrap().unwrap();
        assert!(after.status.is_terminal());

        // Nothing moves a closed ticket: claims and transitions keyed on a
        // status the ticket left behind all miss their precondition.
        assert!(!store.claim(ticket.job_id, &identity("p@c.us")).await.unwrap());
        assert!(!store
            .transition(
                ticket.job_id,
                TicketStatus::Broadcasted,
                TicketStatus::PendingClientApproval,
            )
            .await
            .unwrap());
        assert_eq!(
            store.get(ticket.job_id).await.unwrap().unwrap().status,
            TicketStatus::FailedNoArtisans
        );
    }

    #[tokio::test]
    async fn reported_outcome_rides_with_pending_verification() {
        let store = store().await;
        let ticket = broadcasted_ticket(&store).await;
        store.claim(ticket.job_id, &identity("p1@c.us")).await.unwrap();
        store
            .transition(
                ticket.job_id,
                TicketStatus::PendingClientApproval,
                TicketStatus::Matched,
            )
            .await
            .unwrap();

        assert!(store
            .record_reported_outcome(ticket.job_id, ReportedOutcome::Completed)
            .await
            .unwrap());
        // Duplicate report: precondition gone, nothing moves.
        assert!(!store
            .record_reported_outcome(ticket.job_id, ReportedOutcome::Cancelled)
            .await
            .unwrap());

        let after = store.get(ticket.job_id).await.unwrap().unwrap();
        assert_eq!(after.status, TicketStatus::PendingVerification);
        assert_eq!(after.reported_outcome, Some(ReportedOutcome::Completed));
    }
}
