//! Database migrations for the document management module

/// Migration SQL for document, review, transmittal and import tables
pub const MIGRATION_SQL: &str = r#"
-- users: accounts allowed to act on documents
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    api_key_prefix TEXT,
    api_key_hash TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_users_api_key_prefix ON users(api_key_prefix);

-- categories: organisation-scoped document containers
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organisation TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE(organisation, name)
);

CREATE TABLE IF NOT EXISTS category_users (
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (category_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_category_users_user ON category_users(user_id);

-- documents: one row per document key, latest revision fields denormalised
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    document_key TEXT NOT NULL UNIQUE,
    contract_number TEXT NOT NULL,
    originator TEXT NOT NULL,
    unit TEXT NOT NULL,
    discipline TEXT NOT NULL,
    document_type TEXT NOT NULL,
    sequential_number TEXT NOT NULL,
    title TEXT NOT NULL,
    title_folded TEXT NOT NULL DEFAULT '',
    latest_revision_id INTEGER,
    current_revision INTEGER NOT NULL DEFAULT 0,
    current_revision_date TEXT,
    status TEXT,
    status_folded TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category_id);

-- revisions: dated, numbered versions of a document with review fields
CREATE TABLE IF NOT EXISTS revisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    revision INTEGER NOT NULL,
    revision_date TEXT NOT NULL,
    status TEXT,
    received_date TEXT,
    klass INTEGER,
    leader_id INTEGER REFERENCES users(id),
    approver_id INTEGER REFERENCES users(id),
    review_start_date TEXT,
    review_due_date TEXT,
    reviewers_step_closed TEXT,
    leader_step_closed TEXT,
    review_end_date TEXT,
    leader_comments TEXT,
    approver_comments TEXT,
    review_round INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE(document_id, revision)
);
CREATE INDEX IF NOT EXISTS idx_revisions_document ON revisions(document_id);
CREATE INDEX IF NOT EXISTS idx_revisions_review ON revisions(review_start_date, review_end_date);

CREATE TABLE IF NOT EXISTS revision_reviewers (
    revision_id INTEGER NOT NULL REFERENCES revisions(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (revision_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_revision_reviewers_user ON revision_reviewers(user_id);

-- reviews: one row per reviewer and review round
CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    revision_id INTEGER NOT NULL REFERENCES revisions(id) ON DELETE CASCADE,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    reviewer_id INTEGER NOT NULL REFERENCES users(id),
    round INTEGER NOT NULL,
    reviewed_on TEXT,
    comments TEXT,
    closed INTEGER NOT NULL DEFAULT 0,
    due_date TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE(revision_id, reviewer_id, round)
);
CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id, closed);

-- distribution_lists: reviewer presets per category
CREATE TABLE IF NOT EXISTS distribution_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    leader_id INTEGER REFERENCES users(id),
    approver_id INTEGER REFERENCES users(id),
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS distribution_list_reviewers (
    list_id INTEGER NOT NULL REFERENCES distribution_lists(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (list_id, user_id)
);

CREATE TABLE IF NOT EXISTS distribution_list_categories (
    list_id INTEGER NOT NULL REFERENCES distribution_lists(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    PRIMARY KEY (list_id, category_id)
);

-- transmittals: batches of revisions sent between categories
CREATE TABLE IF NOT EXISTS transmittals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transmittal_key TEXT NOT NULL UNIQUE,
    from_category_id INTEGER NOT NULL REFERENCES categories(id),
    to_category_id INTEGER NOT NULL REFERENCES categories(id),
    sequential_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'new',
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE(from_category_id, to_category_id, sequential_number)
);

CREATE TABLE IF NOT EXISTS transmittal_revisions (
    transmittal_id INTEGER NOT NULL REFERENCES transmittals(id) ON DELETE CASCADE,
    revision_id INTEGER NOT NULL REFERENCES revisions(id) ON DELETE CASCADE,
    PRIMARY KEY (transmittal_id, revision_id)
);

-- import_batches / imports: CSV bulk imports
CREATE TABLE IF NOT EXISTS import_batches (
    uid TEXT PRIMARY KEY,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_uid TEXT NOT NULL REFERENCES import_batches(uid) ON DELETE CASCADE,
    line INTEGER NOT NULL,
    document_id INTEGER REFERENCES documents(id) ON DELETE SET NULL,
    status TEXT NOT NULL,
    errors TEXT
);
CREATE INDEX IF NOT EXISTS idx_imports_batch ON imports(batch_uid)
"#;

/// Run migration
pub async fn run_migration(pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
    // Split the SQL into individual statements and execute them
    for statement in MIGRATION_SQL.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            let result = sqlx::query(statement).execute(pool).await;

            // Re-running ALTER TABLE ADD COLUMN on an existing column is expected
            if let Err(ref e) = result {
                let is_alter_table = statement.to_uppercase().contains("ALTER TABLE");
                let is_duplicate_column = e.to_string().contains("duplicate column name");

                if !(is_alter_table && is_duplicate_column) {
                    result?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for database-backed tests

    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Single-connection in-memory database with the schema applied
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        super::run_migration(&pool).await.unwrap();
        pool
    }

    pub async fn create_user(pool: &SqlitePool, email: &str) -> i64 {
        sqlx::query("INSERT INTO users (email, name) VALUES (?, ?)")
            .bind(email)
            .bind(email.split('@').next().unwrap_or(email))
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn create_category(pool: &SqlitePool, organisation: &str, name: &str) -> i64 {
        sqlx::query("INSERT INTO categories (organisation, name) VALUES (?, ?)")
            .bind(organisation)
            .bind(name)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn add_to_category(pool: &SqlitePool, category_id: i64, user_id: i64) {
        sqlx::query("INSERT INTO category_users (category_id, user_id) VALUES (?, ?)")
            .bind(category_id)
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_pool;

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let pool = test_pool().await;
        super::run_migration(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('documents', 'revisions', 'reviews') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables.len(), 3);
    }
}
