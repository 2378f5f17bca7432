//! SQLite-backed store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::accounts::{ConnectionState, SocialAccount};
use crate::error::{MingleError, Result, StoreError};
use crate::store::{Profile, RemoteStore, Trend};
use crate::types::{Platform, Post, PostStatus};

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and run migrations.
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }

        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StoreError::Sqlx)?;

        Self::migrated(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::Sqlx)?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }
}

fn timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_timestamp(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", ms)).into())
}

fn local_time(at: NaiveDateTime) -> String {
    at.format(LOCAL_TIME_FORMAT).to_string()
}

fn parse_local_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, LOCAL_TIME_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("bad local time '{}': {}", value, e)).into())
}

fn corrupt(error: MingleError) -> MingleError {
    match error {
        MingleError::Store(_) => error,
        other => StoreError::Corrupt(other.to_string()).into(),
    }
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
        created_at: from_timestamp(row.get("created_at"))?,
        updated_at: from_timestamp(row.get("updated_at"))?,
    })
}

fn trend_from_row(row: &SqliteRow) -> Result<Trend> {
    let tags: String = row.get("tags");
    Ok(Trend {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        created_by: row.get("created_by"),
        created_at: from_timestamp(row.get("created_at"))?,
        updated_at: from_timestamp(row.get("updated_at"))?,
        likes: row.get("likes"),
        tags: serde_json::from_str(&tags).map_err(StoreError::Serialization)?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let platform: String = row.get("platform");
    let status: String = row.get("status");
    let scheduled_at: String = row.get("scheduled_at");
    let engagement: Option<i64> = row.get("engagement");

    let engagement = engagement
        .map(u64::try_from)
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("negative engagement: {}", e)))?;

    Post::restore(
        row.get("id"),
        row.get("title"),
        parse_local_time(&scheduled_at)?,
        platform.parse::<Platform>().map_err(corrupt)?,
        status.parse::<PostStatus>().map_err(corrupt)?,
        engagement,
    )
    .map(|post| post.with_body(row.get::<String, _>("body")))
    .map_err(corrupt)
}

fn account_from_row(row: &SqliteRow) -> Result<SocialAccount> {
    let platform: String = row.get("platform");
    let state: String = row.get("state");
    let last_synced_at: Option<String> = row.get("last_synced_at");

    let state = match state.as_str() {
        "connected" => ConnectionState::Connected,
        "disconnected" => ConnectionState::Disconnected,
        other => {
            return Err(StoreError::Corrupt(format!("unknown account state '{}'", other)).into())
        }
    };

    Ok(SocialAccount::restore(
        platform.parse::<Platform>().map_err(corrupt)?,
        row.get("username"),
        state,
        last_synced_at.as_deref().map(parse_local_time).transpose()?,
    ))
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, full_name, avatar_url, created_at, updated_at
            FROM profiles WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, avatar_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(timestamp(profile.created_at))
        .bind(timestamp(profile.updated_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        Ok(())
    }

    async fn list_trends(&self) -> Result<Vec<Trend>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, category, created_by, created_at, updated_at, likes, tags
            FROM trends
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        rows.iter().map(trend_from_row).collect()
    }

    async fn get_trend(&self, id: &str) -> Result<Option<Trend>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, category, created_by, created_at, updated_at, likes, tags
            FROM trends WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        row.as_ref().map(trend_from_row).transpose()
    }

    async fn save_trend(&self, trend: &Trend) -> Result<()> {
        let tags = serde_json::to_string(&trend.tags).map_err(StoreError::Serialization)?;

        sqlx::query(
            r#"
            INSERT INTO trends (id, title, description, category, created_by, created_at, updated_at, likes, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                category = excluded.category,
                updated_at = excluded.updated_at,
                tags = excluded.tags
            "#,
        )
        .bind(&trend.id)
        .bind(&trend.title)
        .bind(&trend.description)
        .bind(&trend.category)
        .bind(&trend.created_by)
        .bind(timestamp(trend.created_at))
        .bind(timestamp(trend.updated_at))
        .bind(trend.likes)
        .bind(tags)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        Ok(())
    }

    async fn delete_trend(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM trends WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn like_trend(&self, id: &str) -> Result<i64> {
        let row = sqlx::query("UPDATE trends SET likes = likes + 1 WHERE id = ? RETURNING likes")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Sqlx)?;

        row.map(|r| r.get::<i64, _>("likes"))
            .ok_or_else(|| MingleError::not_found("Trend", id))
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        let engagement = post
            .engagement()
            .map(i64::try_from)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("engagement too large: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, scheduled_at, platform, status, engagement, body, position)
            VALUES (?, ?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM posts))
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                scheduled_at = excluded.scheduled_at,
                platform = excluded.platform,
                status = excluded.status,
                engagement = excluded.engagement,
                body = excluded.body
            "#,
        )
        .bind(post.id())
        .bind(post.title())
        .bind(local_time(post.scheduled_at()))
        .bind(post.platform().as_str())
        .bind(post.status().as_str())
        .bind(engagement)
        .bind(post.body())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        Ok(())
    }

    async fn remove_post(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Sqlx)?;

        Ok(())
    }

    async fn load_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, scheduled_at, platform, status, engagement, body
            FROM posts
            ORDER BY position ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        rows.iter().map(post_from_row).collect()
    }

    async fn save_account(&self, account: &SocialAccount) -> Result<()> {
        if account.state().is_pending() {
            return Err(StoreError::Corrupt(format!(
                "refusing to persist pending {} account",
                account.platform()
            ))
            .into());
        }

        sqlx::query(
            r#"
            INSERT INTO accounts (platform, username, state, last_synced_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(platform) DO UPDATE SET
                username = excluded.username,
                state = excluded.state,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(account.platform().as_str())
        .bind(account.username())
        .bind(account.state().as_str())
        .bind(account.last_synced_at().map(local_time))
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        Ok(())
    }

    async fn load_accounts(&self) -> Result<Vec<SocialAccount>> {
        let rows = sqlx::query(
            r#"
            SELECT platform, username, state, last_synced_at
            FROM accounts
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        let mut accounts = rows
            .iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>>>()?;
        accounts.sort_by_key(|a| a.platform());
        Ok(accounts)
    }
}
