//! Account queries

use shared::models::{UserProfile, UserRole};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use super::RepoResult;
use crate::util::{now_millis, snowflake_id};

const PROFILE_SELECT: &str = "SELECT id, email, first_name, last_name, phone, role, status, coins_balance, created_at FROM users";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub role: UserRole,
}

pub async fn find_profile(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<UserProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE id = ?");
    sqlx::query_as::<_, UserProfile>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await
}

/// Account id and password hash for a login attempt (email is case-insensitive)
pub async fn find_credentials(pool: &SqlitePool, email: &str) -> RepoResult<Option<(i64, String)>> {
    sqlx::query_as::<_, (i64, String)>("SELECT id, password_hash FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> RepoResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn create(pool: &SqlitePool, user: NewUser<'_>) -> RepoResult<UserProfile> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, status, coins_balance, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'ACTIVE', 0, ?8, ?8)",
    )
    .bind(id)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.phone)
    .bind(user.role)
    .bind(now)
    .execute(pool)
    .await?;

    find_profile(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Credit earned coins to an account
pub async fn add_coins(conn: &mut SqliteConnection, user_id: i64, coins: i64) -> RepoResult<()> {
    sqlx::query("UPDATE users SET coins_balance = coins_balance + ?1, updated_at = ?2 WHERE id = ?3")
        .bind(coins)
        .bind(now_millis())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
