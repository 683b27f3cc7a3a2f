use chrono::{DateTime, Utc};
use dispatch_types::{ActorIdentity, Session, SessionPhase};
use sqlx::SqlitePool;

use super::StoreError;

/// SQLite-backed session store, one row per actor identity.
///
/// The phase column holds the tagged-JSON serialization of [`SessionPhase`];
/// `last_message` and `updated_at` are bookkeeping only and never drive
/// control flow. Rows are created on first contact and never deleted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the sessions table if it does not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                identity     TEXT PRIMARY KEY,
                phase        TEXT NOT NULL,
                last_message TEXT,
                updated_at   TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, identity: &ActorIdentity) -> Result<Option<Session>, StoreError> {
        let row: Option<(String, Option<String>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT phase, last_message, updated_at FROM sessions WHERE identity = ?",
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some((phase_json, last_message, updated_at)) => {
                let phase = serde_json::from_str(&phase_json).map_err(|source| {
                    StoreError::CorruptPhase {
                        identity: identity.to_string(),
                        source,
                    }
                })?;
                Ok(Some(Session {
                    identity: identity.clone(),
                    phase,
                    last_message,
                    updated_at,
                }))
            }
        }
    }

    /// Load the actor's session, creating it in phase `New` on first contact.
    /// `INSERT OR IGNORE` keeps a concurrent first contact from the same
    /// identity single-row; whichever write lands first wins.
    pub async fn load_or_create(&self, identity: &ActorIdentity) -> Result<Session, StoreError> {
        if let Some(session) = self.get(identity).await? {
            return Ok(session);
        }

        let phase_json = encode_phase(identity, &SessionPhase::New)?;
        sqlx::query(
            "INSERT OR IGNORE INTO sessions (identity, phase, updated_at) VALUES (?, ?, ?)",
        )
        .bind(identity.as_str())
        .bind(&phase_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(identity)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn set_phase(
        &self,
        identity: &ActorIdentity,
        phase: &SessionPhase,
    ) -> Result<(), StoreError> {
        let phase_json = encode_phase(identity, phase)?;
        sqlx::query("UPDATE sessions SET phase = ?, updated_at = ? WHERE identity = ?")
            .bind(&phase_json)
            .bind(Utc::now())
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record the latest inbound text. Bookkeeping only.
    pub async fn touch(&self, identity: &ActorIdentity, last_message: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET last_message = ?, updated_at = ? WHERE identity = ?")
            .bind(last_message)
            .bind(Utc::now())
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn encode_phase(identity: &ActorIdentity, phase: &SessionPhase) -> Result<String, StoreError> {
    serde_json::to_string(phase).map_err(|source| StoreError::CorruptPhase {
        identity: identity.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SessionStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SessionStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn first_contact_creates_new_session() {
        let store = store().await;
        let id = ActorIdentity::parse("100@c.us").unwrap();

        let session = store.load_or_create(&id).await.unwrap();
        assert_eq!(session.phase, SessionPhase::New);

        store
            .set_phase(&id, &SessionPhase::AwaitingIntakeType)
            .await
            .unwrap();
        let session = store.load_or_create(&id).await.unwrap();
        assert_eq!(session.phase, SessionPhase::AwaitingIntakeType);
    }

    #[tokio::test]
    async fn corrupt_phase_is_an_error_not_a_silent_skip() {
        let store = store().await;
        let id = ActorIdentity::parse("101@c.us").unwrap();
        store.load_or_create(&id).await.unwrap();

        sqlx::query("UPDATE sessions SET phase = 'AWAITING_DESC_Plumbing_Block_A' WHERE identity = ?")
            .bind(id.as_str())
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptPhase { .. }));
    }
}
