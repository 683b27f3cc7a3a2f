use dispatch_types::{ActorIdentity, Category, Provider};
use sqlx::SqlitePool;

use super::StoreError;

type ProviderRow = (String, String, String, f64, bool);

/// SQLite-backed provider profiles. Profiles are owned by an external
/// provider-management process; the engine reads eligibility and display
/// attributes and flips `is_available` around a job's lifetime. One identity
/// may carry several profiles (one per category), so display lookups take
/// the first.
#[derive(Debug, Clone)]
pub struct ProviderStore {
    pool: SqlitePool,
}

impl ProviderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the providers table if it does not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS providers (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                identity     TEXT NOT NULL,
                name         TEXT NOT NULL,
                category     TEXT NOT NULL,
                rating       REAL NOT NULL DEFAULT 0,
                is_available INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS providers_category
             ON providers (category, is_available)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Up to `limit` available profiles in `category`, in store order.
    pub async fn eligible(
        &self,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Provider>, StoreError> {
        let rows: Vec<ProviderRow> = sqlx::query_as(
            "SELECT identity, name, category, rating, is_available
             FROM providers
             WHERE category = ? AND is_available = 1
             LIMIT ?",
        )
        .bind(category.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_row).collect()
    }

    /// Display attributes (name, rating) for claim-time messaging. An
    /// identity can hold multiple profiles; any one of them names the person.
    pub async fn display_profile(
        &self,
        identity: &ActorIdentity,
    ) -> Result<Option<Provider>, StoreError> {
        let row: Option<ProviderRow> = sqlx::query_as(
            "SELECT identity, name, category, rating, is_available
             FROM providers
             WHERE identity = ?
             LIMIT 1",
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_row).transpose()
    }

    /// Flip availability across all of an identity's profiles. False on
    /// approval, back to true on the closing report.
    pub async fn set_available(
        &self,
        identity: &ActorIdentity,
        available: bool,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE providers SET is_available = ? WHERE identity = ?")
            .bind(available)
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Register a profile. Used by seeding and tests; production profiles
    /// arrive through the external provider-management process.
    pub async fn insert(&self, provider: &Provider) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO providers (identity, name, category, rating, is_available)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(provider.identity.as_str())
        .bind(&provider.name)
        .bind(provider.category.as_str())
        .bind(provider.rating)
        .bind(provider.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn map_row(row: ProviderRow) -> Result<Provider, StoreError> {
    let (identity, name, category, rating, is_available) = row;
    Ok(Provider {
        identity: ActorIdentity(identity),
        name,
        category: category.parse()?,
        rating,
        is_available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ProviderStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = ProviderStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn profile(identity: &str, category: Category) -> Provider {
        Provider {
            identity: ActorIdentity::parse(identity).unwrap(),
            name: format!("Artisan {identity}"),
            category,
            rating: 4.5,
            is_available: true,
        }
    }

    #[tokio::test]
    async fn unavailable_profiles_never_selected() {
        let store = store().await;
        for i in 0..5 {
            store
                .insert(&profile(&format!("p{i}@c.us"), Category::Electrical))
                .await
                .unwrap();
        }
        store
            .set_available(&ActorIdentity::parse("p0@c.us").unwrap(), false)
            .await
            .unwrap();

        let eligible = store.eligible(Category::Electrical, 3).await.unwrap();
        assert_eq!(eligible.len(), 3);
        assert!(eligible.iter().all(|p| p.identity.as_str() != "p0@c.us"));
        assert!(store
            .eligible(Category::Carpentry, 3)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn display_lookup_tolerates_multiple_profiles() {
        let store = store().await;
        store
            .insert(&profile("multi@c.us", Category::Electrical))
            .await
            .unwrap();
        store
            .insert(&profile("multi@c.us", Category::Plumbing))
            .await
            .unwrap();

        let found = store
            .display_profile(&ActorIdentity::parse("multi@c.us").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Artisan multi@c.us");
    }
}
