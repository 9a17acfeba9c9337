//! Operator accounts stored in `LoginTbl`.

use crate::{
    core::credentials,
    entities::{Login, LoginColumn, login},
    errors::{Error, Result},
};
use sea_orm::{ActiveValue::Unchanged, PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{info, warn};

/// Stored credential for `username`, if the account exists.
pub async fn find_hash<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<String>> {
    Ok(Login::find_by_id(username.to_owned())
        .one(db)
        .await?
        .map(|account| account.password_hash))
}

/// Number of accounts.
pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Login::find().count(db).await.map_err(Into::into)
}

/// Every username, alphabetically.
pub async fn usernames<C: ConnectionTrait>(db: &C) -> Result<Vec<String>> {
    Login::find()
        .select_only()
        .column(LoginColumn::Username)
        .order_by_asc(LoginColumn::Username)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an account, hashing `password` under a fresh salt.
pub async fn add<C: ConnectionTrait>(db: &C, username: &str, password: &str) -> Result<()> {
    login::ActiveModel {
        username: Set(username.to_owned()),
        password_hash: Set(credentials::hash_password(password)),
    }
    .insert(db)
    .await?;
    info!(username, "Created account");
    Ok(())
}

/// Removes an account.
pub async fn delete<C: ConnectionTrait>(db: &C, username: &str) -> Result<()> {
    let deleted = Login::delete_by_id(username.to_owned())
        .exec(db)
        .await?
        .rows_affected;
    if deleted == 0 {
        return Err(Error::NotFound {
            entity: "User",
            id: username.to_owned(),
        });
    }
    info!(username, "Deleted account");
    Ok(())
}

/// Replaces the stored credential with a fresh hash of `password`.
pub async fn change_password<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<()> {
    login::ActiveModel {
        username: Unchanged(username.to_owned()),
        password_hash: Set(credentials::hash_password(password)),
    }
    .update(db)
    .await
    .map_err(|e| match e {
        DbErr::RecordNotUpdated => Error::NotFound {
            entity: "User",
            id: username.to_owned(),
        },
        other => other.into(),
    })?;
    info!(username, "Changed password");
    Ok(())
}

/// True when the account exists and `password` matches its stored credential.
pub async fn verify_login<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<bool> {
    let verified = find_hash(db, username)
        .await?
        .is_some_and(|stored| credentials::verify_password(&stored, password));
    if !verified {
        warn!(username, "Rejected login");
    }
    Ok(verified)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::database::{self, DEFAULT_PASSWORD, DEFAULT_USERNAME};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_seeded_admin_can_log_in() -> Result<()> {
        let db = setup_test_db().await?;
        database::seed_default_user(&db).await?;

        assert!(verify_login(&db, DEFAULT_USERNAME, DEFAULT_PASSWORD).await?);
        assert!(!verify_login(&db, DEFAULT_USERNAME, "wrong").await?);
        assert!(!verify_login(&db, "nobody", DEFAULT_PASSWORD).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_count_and_list() -> Result<()> {
        let db = setup_test_db().await?;
        add(&db, "zoe", "secret1").await?;
        add(&db, "alex", "secret2").await?;

        assert_eq!(count(&db).await?, 2);
        assert_eq!(usernames(&db).await?, ["alex", "zoe"]);
        assert!(find_hash(&db, "alex").await?.unwrap().len() > credentials::SALT_LEN);
        assert!(find_hash(&db, "sam").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_change_password() -> Result<()> {
        let db = setup_test_db().await?;
        add(&db, "alex", "secret1").await?;
        change_password(&db, "alex", "better-secret").await?;

        assert!(verify_login(&db, "alex", "better-secret").await?);
        assert!(!verify_login(&db, "alex", "secret1").await?);
        assert!(matches!(
            change_password(&db, "sam", "whatever").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete() -> Result<()> {
        let db = setup_test_db().await?;
        add(&db, "alex", "secret1").await?;
        delete(&db, "alex").await?;

        assert_eq!(count(&db).await?, 0);
        assert!(matches!(delete(&db, "alex").await, Err(Error::NotFound { .. })));
        Ok(())
    }
}
