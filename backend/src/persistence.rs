//! `GamePersistence` over sqlite, grounded on `original_source/internal/db/db.go`
//! (a `SaveGame` that writes a games row plus its move list) and the
//! teacher's `sqlx` usage in `backend/src/auth.rs`.
//!
//! Board history is deliberately not persisted: §7's Non-goals exclude
//! "persistence of intermediate board states", so only the final PGN and
//! the move list (sufficient to replay the game) are written.

use async_trait::async_trait;
use server_core::collaborators::{GamePersistence, SaveGameRequest};
use sqlx::{Pool, Sqlite};

pub struct SqlxPersistence {
    pool: Pool<Sqlite>,
}

impl SqlxPersistence {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        SqlxPersistence { pool }
    }

    pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                white INTEGER NOT NULL,
                black INTEGER NOT NULL,
                pgn TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS moves (
                game_id INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                from_square INTEGER NOT NULL,
                to_square INTEGER NOT NULL,
                promotion INTEGER NOT NULL,
                PRIMARY KEY (game_id, seq)
            );",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl GamePersistence for SqlxPersistence {
    async fn save_game(&self, request: SaveGameRequest) -> Result<(), String> {
        let mut tx = self.pool.begin().await.map_err(|e| e.to_string())?;

        sqlx::query("INSERT INTO games (id, white, black, pgn) VALUES ($1, $2, $3, $4)")
            .bind(request.game_id as i64)
            .bind(request.white as i64)
            .bind(request.black as i64)
            .bind(&request.pgn)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.to_string())?;

        for (seq, mv) in request.move_history.iter().enumerate() {
            sqlx::query(
                "INSERT INTO moves (game_id, seq, from_square, to_square, promotion) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(request.game_id as i64)
            .bind(seq as i64)
            .bind(mv.from as i64)
            .bind(mv.to as i64)
            .bind(mv.promotion as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.to_string())?;
        }

        tx.commit().await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use server_core::collaborators::MoveRecord;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect(":memory:").await.unwrap();
        SqlxPersistence::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_game_writes_the_game_row_and_its_moves() {
        let pool = test_pool().await;
        let persistence = SqlxPersistence::new(pool.clone());

        let request = SaveGameRequest {
            game_id: 1,
            white: 10,
            black: 20,
            board_history: vec![],
            move_history: vec![MoveRecord { from: 12, to: 28, promotion: 0 }],
            pgn: "1. e2e4".to_string(),
        };

        persistence.save_game(request).await.expect("save_game should succeed");

        let row = sqlx::query("SELECT white, black, pgn FROM games WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        let white: i64 = row.get("white");
        assert_eq!(white, 10);

        let move_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moves WHERE game_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(move_count, 1);
    }
}
