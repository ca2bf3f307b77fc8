// Persistence seam for the dedup stage.
//
// DuplicateStore is what the runner talks to; PgDuplicateStore backs it with
// Postgres and MemoryStore (testing.rs) with a Vec. The detector itself never
// touches storage.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use newsdesk_common::{Article, DuplicateGroup};

#[async_trait]
pub trait DuplicateStore: Send + Sync {
    /// Articles that are scraped, fully processed and not yet flagged as a
    /// duplicate by an earlier run.
    async fn candidate_articles(&self) -> Result<Vec<Article>>;

    /// Write groups, their member rows and the duplicate flags on the
    /// underlying articles, all or nothing. Returns articles flagged.
    async fn save_duplicate_groups(&self, groups: &[DuplicateGroup]) -> Result<usize>;
}

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    url_hash: String,
    title: String,
    source: String,
    feed_priority: i32,
    published_at: Option<DateTime<Utc>>,
    collected_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            url_hash: row.url_hash,
            title: row.title,
            source: row.source,
            feed_priority: row.feed_priority,
            published_at: row.published_at,
            collected_at: row.collected_at,
        }
    }
}

pub struct PgDuplicateStore {
    pool: PgPool,
}

impl PgDuplicateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run dedup migrations")?;
        Ok(())
    }
}

#[async_trait]
impl DuplicateStore for PgDuplicateStore {
    async fn candidate_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT url_hash, title, source, feed_priority, published_at, collected_at
            FROM articles
            WHERE scrape_status = 'success'
              AND processing_complete
              AND NOT is_duplicate
            ORDER BY COALESCE(published_at, collected_at)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load dedup candidates")?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn save_duplicate_groups(&self, groups: &[DuplicateGroup]) -> Result<usize> {
        if groups.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut flagged = 0usize;

        for group in groups {
            let group_id = Uuid::new_v4();

            sqlx::query(
                r#"
                INSERT INTO duplicate_groups
                    (id, canonical_url_hash, confidence, member_count, detected_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(group_id)
            .bind(&group.canonical_url_hash)
            .bind(group.confidence)
            .bind(group.member_count() as i32)
            .bind(group.detected_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert group for {}", group.canonical_url_hash))?;

            for hash in &group.duplicate_url_hashes {
                sqlx::query(
                    r#"
                    INSERT INTO duplicate_group_members (group_id, url_hash)
                    VALUES ($1, $2)
                    "#,
                )
                .bind(group_id)
                .bind(hash)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert group member {hash}"))?;
            }

            let result = sqlx::query(
                r#"
                UPDATE articles
                SET is_duplicate = TRUE, canonical_url_hash = $1
                WHERE url_hash = ANY($2)
                "#,
            )
            .bind(&group.canonical_url_hash)
            .bind(group.duplicate_url_hashes.as_slice())
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to flag duplicates of {}", group.canonical_url_hash)
            })?;

            flagged += result.rows_affected() as usize;
        }

        tx.commit().await.context("Failed to commit duplicate groups")?;

        info!(groups = groups.len(), flagged, "Saved duplicate groups");
        Ok(flagged)
    }
}
