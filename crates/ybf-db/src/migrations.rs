use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE admin_passwords (
                id              TEXT PRIMARY KEY,
                action          TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE announcements (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE questions (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                question    TEXT NOT NULL,
                answer      TEXT,
                answered_at TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE testimonies (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                testimony   TEXT NOT NULL,
                approved    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE blog_posts (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                author_name TEXT NOT NULL,
                image_url   TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE blog_comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES blog_posts(id),
                name        TEXT NOT NULL,
                comment     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_blog_comments_post
                ON blog_comments(post_id, created_at);

            CREATE TABLE books (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                author          TEXT NOT NULL,
                description     TEXT,
                cover_image_url TEXT NOT NULL,
                file_url        TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE book_reviews (
                id          TEXT PRIMARY KEY,
                book_id     TEXT NOT NULL REFERENCES books(id),
                user_name   TEXT NOT NULL,
                review      TEXT NOT NULL,
                rating      INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_book_reviews_book
                ON book_reviews(book_id, created_at);

            CREATE TABLE gallery_images (
                id          TEXT PRIMARY KEY,
                title       TEXT,
                image_url   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                date        TEXT NOT NULL,
                audio_url   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE donations (
                id                      TEXT PRIMARY KEY,
                donor_name              TEXT NOT NULL,
                donor_email             TEXT NOT NULL,
                donor_phone             TEXT NOT NULL,
                amount                  REAL NOT NULL,
                payment_method          TEXT NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'pending',
                transaction_reference   TEXT,
                created_at              TEXT NOT NULL
            );

            CREATE TABLE contact_submissions (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE storage_objects (
                bucket          TEXT NOT NULL,
                key             TEXT NOT NULL,
                content_type    TEXT NOT NULL,
                size            INTEGER NOT NULL,
                sha256          TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                PRIMARY KEY (bucket, key)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
