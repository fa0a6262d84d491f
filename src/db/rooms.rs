use sqlx::{Row, SqlitePool};

use super::users::{get_user, row_to_user};
use crate::error::AppError;
use crate::models::room::{CreateRoom, Room, RoomRow};
use crate::models::user::User;
use crate::snowflake;

fn row_to_room(row: sqlx::sqlite::SqliteRow) -> RoomRow {
    RoomRow {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

const SELECT_ROOMS: &str = "SELECT id, name, description, created_at FROM rooms";

pub async fn get_room_row(pool: &SqlitePool, room_id: &str) -> Result<RoomRow, AppError> {
    let row = sqlx::query(&format!("{SELECT_ROOMS} WHERE id = ?"))
        .bind(room_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_room".to_string()))?;

    Ok(row_to_room(row))
}

pub async fn list_room_users(pool: &SqlitePool, room_id: &str) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query(
        "SELECT u.id, u.name, u.email, u.created_at FROM users u INNER JOIN user_rooms ur ON ur.user_id = u.id WHERE ur.room_id = ? ORDER BY ur.joined_at ASC, u.rowid ASC",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_user).collect())
}

/// Load a room together with its members.
pub async fn get_room(pool: &SqlitePool, room_id: &str) -> Result<Room, AppError> {
    let row = get_room_row(pool, room_id).await?;
    let users = list_room_users(pool, &row.id).await?;
    Ok(row.with_users(users))
}

pub async fn list_rooms(pool: &SqlitePool) -> Result<Vec<Room>, AppError> {
    let rows = sqlx::query(&format!("{SELECT_ROOMS} ORDER BY rowid ASC"))
        .fetch_all(pool)
        .await?;

    let mut rooms = Vec::with_capacity(rows.len());
    for row in rows.into_iter().map(row_to_room) {
        let users = list_room_users(pool, &row.id).await?;
        rooms.push(row.with_users(users));
    }
    Ok(rooms)
}

pub async fn create_room(pool: &SqlitePool, input: &CreateRoom) -> Result<Room, AppError> {
    let id = snowflake::generate();

    sqlx::query("INSERT INTO rooms (id, name, description) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(input.name.trim())
        .bind(&input.description)
        .execute(pool)
        .await?;

    get_room(pool, &id).await
}

/// Record `user_id` as a member of `room_id`. Adding an existing member is a no-op.
pub async fn add_user(pool: &SqlitePool, room_id: &str, user_id: &str) -> Result<(), AppError> {
    get_room_row(pool, room_id).await?;
    get_user(pool, user_id).await?;

    sqlx::query("INSERT OR IGNORE INTO user_rooms (user_id, room_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(room_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::create_user;
    use crate::models::user::CreateUser;

    async fn pool() -> SqlitePool {
        crate::db::create_pool("sqlite::memory:").await.unwrap()
    }

    fn room(name: &str) -> CreateRoom {
        CreateRoom {
            name: name.to_string(),
            description: format!("{name} room"),
        }
    }

    async fn user(pool: &SqlitePool, name: &str) -> User {
        create_user(
            pool,
            &CreateUser {
                name: name.to_string(),
                email: format!("{name}@example.com"),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_room_starts_empty() {
        let pool = pool().await;
        let created = create_room(&pool, &room("lobby")).await.unwrap();
        assert_eq!(created.name, "lobby");
        assert_eq!(created.description, "lobby room");
        assert!(created.users.is_empty());
    }

    #[tokio::test]
    async fn test_add_user_is_idempotent() {
        let pool = pool().await;
        let lobby = create_room(&pool, &room("lobby")).await.unwrap();
        let alice = user(&pool, "alice").await;

        add_user(&pool, &lobby.id, &alice.id).await.unwrap();
        add_user(&pool, &lobby.id, &alice.id).await.unwrap();

        let loaded = get_room(&pool, &lobby.id).await.unwrap();
        assert_eq!(loaded.users, vec![alice]);
    }

    #[tokio::test]
    async fn test_add_user_unknown_room_or_user() {
        let pool = pool().await;
        let lobby = create_room(&pool, &room("lobby")).await.unwrap();
        let alice = user(&pool, "alice").await;

        let err = add_user(&pool, "missing", &alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "unknown_room"));
        let err = add_user(&pool, &lobby.id, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "unknown_user"));
    }

    #[tokio::test]
    async fn test_list_rooms_includes_members() {
        let pool = pool().await;
        let a = create_room(&pool, &room("a")).await.unwrap();
        create_room(&pool, &room("b")).await.unwrap();
        let bob = user(&pool, "bob").await;
        add_user(&pool, &a.id, &bob.id).await.unwrap();

        let rooms = list_rooms(&pool).await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].name, "a");
        assert_eq!(rooms[0].users.len(), 1);
        assert!(rooms[1].users.is_empty());
    }
}
