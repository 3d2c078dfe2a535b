use airops_core::identity::Account;
use airops_core::repository::CredentialStore;
use airops_core::CoreResult;
use airops_shared::Masked;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::map_db_error;

/// Looks up `app_user`; passwords are stored as pgcrypto `crypt()` hashes.
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    username: String,
    user_type: String,
    specific_id: Option<String>,
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_account(
        &self,
        username: &str,
        password: &Masked<String>,
    ) -> CoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT username, user_type, specific_id
            FROM app_user
            WHERE username = $1 AND password_hash = crypt($2, password_hash)
            "#,
        )
        .bind(username.trim())
        .bind(password.expose())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|r| Account {
            username: r.username,
            user_type: r.user_type,
            specific_id: r.specific_id,
        }))
    }
}
