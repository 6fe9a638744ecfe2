//! Username/password accounts.
//!
//! Passwords arrive already hashed by the client and are compared as stored.

use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;

use crate::{
    models::{CreateCustomerEntity, CreateUserEntity, UserEntity},
    schema::{customers, users},
    services::{ServiceError, ServiceResult, is_unique_violation},
};

/// Northwind `company_name` width; the username doubles as company name.
const MAX_USERNAME_LEN: usize = 40;
const MAX_CONTACT_NAME_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub accept_policy: bool,
    pub accept_marketing: bool,
}

pub fn validate_new_account(account: &NewAccount) -> ServiceResult<()> {
    let username = account.username.trim();
    if username.is_empty() {
        return Err(ServiceError::Validation("Username is required".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::Validation(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if username != account.username {
        return Err(ServiceError::Validation(
            "Username cannot start or end with whitespace".into(),
        ));
    }
    if account.password.is_empty() {
        return Err(ServiceError::Validation("Password is required".into()));
    }
    Ok(())
}

/// Creates the user and, if missing, the customer row keyed by the username.
pub async fn register(conn: &mut AsyncPgConnection, account: NewAccount) -> ServiceResult<UserEntity> {
    validate_new_account(&account)?;

    let user = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let existing: Option<i32> = users::table
                    .filter(users::username.eq(&account.username))
                    .select(users::id)
                    .first(conn)
                    .await
                    .optional()?;
                if existing.is_some() {
                    return Err(ServiceError::Conflict("Username already exists".into()));
                }

                diesel::insert_into(customers::table)
                    .values(CreateCustomerEntity {
                        customer_id: &account.username,
                        company_name: &account.username,
                        contact_name: (account.username.chars().count() <= MAX_CONTACT_NAME_LEN)
                            .then_some(account.username.as_str()),
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;

                let user = diesel::insert_into(users::table)
                    .values(CreateUserEntity {
                        username: &account.username,
                        password: &account.password,
                        accept_policy: account.accept_policy,
                        accept_marketing: account.accept_marketing,
                    })
                    .returning(UserEntity::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err) {
                            ServiceError::Conflict("Username already exists".into())
                        } else {
                            err.into()
                        }
                    })?;

                Ok::<UserEntity, ServiceError>(user)
            })
        })
        .await?;

    info!("Registered user {} (#{})", user.username, user.id);
    Ok(user)
}

pub async fn authenticate(
    conn: &mut AsyncPgConnection,
    username: &str,
    password: &str,
) -> ServiceResult<UserEntity> {
    users::table
        .filter(users::username.eq(username))
        .filter(users::password.eq(password))
        .select(UserEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(invalid_credentials)
}

pub async fn change_password(
    conn: &mut AsyncPgConnection,
    username: &str,
    current_password: &str,
    new_password: &str,
) -> ServiceResult<()> {
    if new_password.is_empty() {
        return Err(ServiceError::Validation("Password is required".into()));
    }

    let updated = diesel::update(
        users::table
            .filter(users::username.eq(username))
            .filter(users::password.eq(current_password)),
    )
    .set(users::password.eq(new_password))
    .execute(conn)
    .await?;

    if updated == 0 {
        return Err(invalid_credentials());
    }

    info!("Password changed for {}", username);
    Ok(())
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid username or password".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, password: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            password: password.into(),
            accept_policy: true,
            accept_marketing: false,
        }
    }

    #[test]
    fn accepts_regular_account() {
        assert!(validate_new_account(&account("alice", "5f4dcc3b")).is_ok());
    }

    #[test]
    fn rejects_blank_or_padded_usernames() {
        assert!(validate_new_account(&account("", "x")).is_err());
        assert!(validate_new_account(&account("   ", "x")).is_err());
        assert!(validate_new_account(&account(" alice", "x")).is_err());
    }

    #[test]
    fn rejects_overlong_username() {
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_new_account(&account(&long, "x")).is_err());
        let max = "a".repeat(MAX_USERNAME_LEN);
        assert!(validate_new_account(&account(&max, "x")).is_ok());
    }

    #[test]
    fn rejects_empty_password() {
        assert!(matches!(
            validate_new_account(&account("alice", "")),
            Err(ServiceError::Validation(_))
        ));
    }
}
