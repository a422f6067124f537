// src/common/migrations.rs
//! Database migration and schema management
//!
//! Migrations are versioned and recorded in `schema_migrations`. Each pending
//! migration runs inside its own transaction; any failure is returned to the
//! caller so the server never starts on a half-migrated schema.

use sqlx::SqlitePool;
use tracing::{info, warn};

struct Migration {
    version: i64,
    name: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[
            r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL DEFAULT '',
                created_at TEXT DEFAULT (datetime('now'))
            )
            "#,
            "CREATE INDEX idx_users_email ON users(email)",
        ],
    },
    Migration {
        version: 2,
        name: "create_tasks",
        statements: &[
            r#"
            CREATE TABLE tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                deadline TEXT,
                priority TEXT NOT NULL DEFAULT 'Medium'
                    CHECK (priority IN ('High', 'Medium', 'Low')),
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT DEFAULT (datetime('now')),
                updated_at TEXT DEFAULT (datetime('now')),
                FOREIGN KEY(user_id) REFERENCES users(id)
            )
            "#,
            "CREATE INDEX idx_tasks_user_id ON tasks(user_id)",
            "CREATE INDEX idx_tasks_title ON tasks(title)",
        ],
    },
    Migration {
        version: 3,
        name: "user_google_tokens",
        statements: &[
            "ALTER TABLE users ADD COLUMN auth_provider TEXT NOT NULL DEFAULT 'local'",
            "ALTER TABLE users ADD COLUMN google_access_token TEXT",
            "ALTER TABLE users ADD COLUMN google_refresh_token TEXT",
            "ALTER TABLE users ADD COLUMN google_token_expiry TEXT",
        ],
    },
    Migration {
        version: 4,
        name: "task_calendar_and_location",
        statements: &[
            "ALTER TABLE tasks ADD COLUMN all_day INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE tasks ADD COLUMN google_event_id TEXT",
            "ALTER TABLE tasks ADD COLUMN address TEXT",
            "ALTER TABLE tasks ADD COLUMN latitude REAL",
            "ALTER TABLE tasks ADD COLUMN longitude REAL",
        ],
    },
];

/// Run all pending database migrations
///
/// With `reset` set, every table is dropped first and the schema is rebuilt from version 1.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current = current_version(pool).await?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;

        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        applied += 1;

        info!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
    }

    info!(
        applied = applied,
        schema_version = latest_version(),
        "✅ Database migration completed successfully!"
    );

    Ok(())
}

pub async fn current_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Drop tables in reverse dependency order
    for table in ["tasks", "users", "schema_migrations"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}
