use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::user::{CreateUser, User};
use crate::snowflake;

pub(crate) fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str = "SELECT id, name, email, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_user".to_string()))?;

    Ok(row_to_user(row))
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query(&format!("{SELECT_USERS} ORDER BY rowid ASC"))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(row_to_user).collect())
}

pub async fn create_user(pool: &SqlitePool, input: &CreateUser) -> Result<User, AppError> {
    let id = snowflake::generate();

    sqlx::query("INSERT INTO users (id, name, email) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(input.name.trim())
        .bind(input.email.trim())
        .execute(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("email already registered".to_string()),
            other => other,
        })?;

    get_user(pool, &id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        crate::db::create_pool("sqlite::memory:").await.unwrap()
    }

    fn input(name: &str, email: &str) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = pool().await;
        let user = create_user(&pool, &input("alice", "alice@example.com"))
            .await
            .unwrap();
        let fetched = get_user(&pool, &user.id).await.unwrap();
        assert_eq!(fetched, user);
        assert_eq!(fetched.name, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let pool = pool().await;
        create_user(&pool, &input("a", "same@example.com")).await.unwrap();
        let err = create_user(&pool, &input("b", "same@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let pool = pool().await;
        let err = get_user(&pool, "404").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_users_in_creation_order() {
        let pool = pool().await;
        create_user(&pool, &input("a", "a@example.com")).await.unwrap();
        create_user(&pool, &input("b", "b@example.com")).await.unwrap();
        let names: Vec<_> = list_users(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
