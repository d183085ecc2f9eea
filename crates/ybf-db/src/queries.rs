use std::collections::HashSet;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use uuid::Uuid;

use ybf_types::models::{
    Announcement, AudioMessage, BlogComment, BlogPost, Book, BookReview, ContactSubmission,
    Donation, GalleryImage, Question, Testimony,
};
use ybf_types::query::{Filter, ListQuery, Table, TypedValue};

use crate::Database;
use crate::entity::Entity;
use crate::models::{AdminPasswordRow, StorageObjectRow};

impl Database {
    // -- Generic reads --

    /// Full ordered list for `query`. No pagination: callers replace their
    /// view wholesale on every fetch.
    pub fn list<E: Entity>(&self, query: &ListQuery) -> Result<Vec<E>> {
        if query.table != E::TABLE {
            bail!("query for '{}' used to read '{}'", query.table, E::TABLE);
        }
        query.validate()?;
        let (sql, params) = build_select(query)?;

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| E::from_row(row))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Same as `list`, serialized to JSON rows. Used where the table is only
    /// known at runtime (realtime subscriptions).
    pub fn list_values(&self, query: &ListQuery) -> Result<Vec<Value>> {
        match query.table {
            Table::Announcements => to_values(self.list::<Announcement>(query)?),
            Table::Questions => to_values(self.list::<Question>(query)?),
            Table::Testimonies => to_values(self.list::<Testimony>(query)?),
            Table::BlogPosts => to_values(self.list::<BlogPost>(query)?),
            Table::BlogComments => to_values(self.list::<BlogComment>(query)?),
            Table::Books => to_values(self.list::<Book>(query)?),
            Table::BookReviews => to_values(self.list::<BookReview>(query)?),
            Table::GalleryImages => to_values(self.list::<GalleryImage>(query)?),
            Table::Messages => to_values(self.list::<AudioMessage>(query)?),
            Table::Donations => to_values(self.list::<Donation>(query)?),
            Table::ContactSubmissions => to_values(self.list::<ContactSubmission>(query)?),
        }
    }

    pub fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E>> {
        self.with_conn(|conn| select_by_id(conn, id))
    }

    // -- Announcements --

    pub fn insert_announcement(&self, a: &Announcement) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO announcements (id, title, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![a.id.to_string(), a.title, a.content, a.created_at],
            )?;
            Ok(())
        })
    }

    /// Returns the removed row, or `None` if it did not exist.
    pub fn delete_announcement(&self, id: Uuid) -> Result<Option<Announcement>> {
        self.delete_by_id(id)
    }

    // -- Questions --

    pub fn insert_question(&self, q: &Question) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO questions (id, name, email, question, answer, answered_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    q.id.to_string(),
                    q.name,
                    q.email,
                    q.question,
                    q.answer,
                    q.answered_at,
                    q.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// Set the answer. Returns `(before, after)`; re-answering overwrites.
    pub fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        answered_at: DateTime<Utc>,
    ) -> Result<Option<(Question, Question)>> {
        self.update_by_id(id, |conn| {
            conn.execute(
                "UPDATE questions SET answer = ?1, answered_at = ?2 WHERE id = ?3",
                rusqlite::params![answer, answered_at, id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Replace the question text. Returns `(before, after)`.
    pub fn edit_question(&self, id: Uuid, question: &str) -> Result<Option<(Question, Question)>> {
        self.update_by_id(id, |conn| {
            conn.execute(
                "UPDATE questions SET question = ?1 WHERE id = ?2",
                rusqlite::params![question, id.to_string()],
            )?;
            Ok(())
        })
    }

    // -- Testimonies --

    pub fn insert_testimony(&self, t: &Testimony) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO testimonies (id, name, testimony, approved, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![t.id.to_string(), t.name, t.testimony, t.approved, t.created_at],
            )?;
            Ok(())
        })
    }

    // -- Blog --

    pub fn insert_blog_post(&self, p: &BlogPost) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blog_posts (id, title, content, author_name, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    p.id.to_string(),
                    p.title,
                    p.content,
                    p.author_name,
                    p.image_url,
                    p.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_blog_comment(&self, c: &BlogComment) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blog_comments (id, post_id, name, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    c.id.to_string(),
                    c.post_id.to_string(),
                    c.name,
                    c.comment,
                    c.created_at
                ],
            )?;
            Ok(())
        })
    }

    // -- Books --

    pub fn insert_book(&self, b: &Book) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO books (id, title, author, description, cover_image_url, file_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    b.id.to_string(),
                    b.title,
                    b.author,
                    b.description,
                    b.cover_image_url,
                    b.file_url,
                    b.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_book_review(&self, r: &BookReview) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO book_reviews (id, book_id, user_name, review, rating, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    r.id.to_string(),
                    r.book_id.to_string(),
                    r.user_name,
                    r.review,
                    r.rating,
                    r.created_at
                ],
            )?;
            Ok(())
        })
    }

    // -- Gallery --

    pub fn insert_gallery_image(&self, g: &GalleryImage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gallery_images (id, title, image_url, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![g.id.to_string(), g.title, g.image_url, g.created_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>> {
        self.delete_by_id(id)
    }

    // -- Messages --

    pub fn insert_message(&self, m: &AudioMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, title, date, audio_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![m.id.to_string(), m.title, m.date, m.audio_url, m.created_at],
            )?;
            Ok(())
        })
    }

    // -- Donations & contact --

    pub fn insert_donation(&self, d: &Donation) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO donations (id, donor_name, donor_email, donor_phone, amount,
                                        payment_method, status, transaction_reference, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    d.id.to_string(),
                    d.donor_name,
                    d.donor_email,
                    d.donor_phone,
                    d.amount,
                    d.payment_method.as_str(),
                    d.status.as_str(),
                    d.transaction_reference,
                    d.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_contact_submission(&self, c: &ContactSubmission) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contact_submissions (id, name, email, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![c.id.to_string(), c.name, c.email, c.message, c.created_at],
            )?;
            Ok(())
        })
    }

    // -- Admin passwords --

    pub fn get_admin_password(&self, action: &str) -> Result<Option<AdminPasswordRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, action, password_hash, created_at FROM admin_passwords WHERE action = ?1",
                    [action],
                    |row| {
                        Ok(AdminPasswordRow {
                            id: row.get(0)?,
                            action: row.get(1)?,
                            password_hash: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Insert the action's hash, or replace it if the action already has one.
    pub fn set_admin_password(&self, action: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_passwords (id, action, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(action) DO UPDATE SET password_hash = excluded.password_hash",
                rusqlite::params![Uuid::new_v4().to_string(), action, password_hash, Utc::now()],
            )?;
            Ok(())
        })
    }

    // -- Storage objects --

    pub fn insert_storage_object(&self, o: &StorageObjectRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO storage_objects (bucket, key, content_type, size, sha256, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![o.bucket, o.key, o.content_type, o.size, o.sha256, o.created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_storage_object(&self, bucket: &str, key: &str) -> Result<Option<StorageObjectRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT bucket, key, content_type, size, sha256, created_at
                     FROM storage_objects WHERE bucket = ?1 AND key = ?2",
                    [bucket, key],
                    storage_object_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_storage_object(&self, bucket: &str, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM storage_objects WHERE bucket = ?1 AND key = ?2",
                [bucket, key],
            )?;
            Ok(n > 0)
        })
    }

    pub fn storage_objects_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StorageObjectRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT bucket, key, content_type, size, sha256, created_at
                 FROM storage_objects WHERE created_at < ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([cutoff], storage_object_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every object URL stored in a content row.
    pub fn referenced_urls(&self) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cover_image_url FROM books
                 UNION SELECT file_url FROM books
                 UNION SELECT image_url FROM gallery_images
                 UNION SELECT image_url FROM blog_posts WHERE image_url IS NOT NULL
                 UNION SELECT audio_url FROM messages",
            )?;
            let urls = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(urls)
        })
    }

    // -- Helpers --

    fn update_by_id<E, F>(&self, id: Uuid, apply: F) -> Result<Option<(E, E)>>
    where
        E: Entity,
        F: FnOnce(&Connection) -> Result<()>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(before) = select_by_id::<E>(&tx, id)? else {
                return Ok(None);
            };
            apply(&tx)?;
            let after = select_by_id::<E>(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("row {} vanished during update", id))?;
            tx.commit()?;
            Ok(Some((before, after)))
        })
    }

    fn delete_by_id<E: Entity>(&self, id: Uuid) -> Result<Option<E>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = select_by_id::<E>(&tx, id)? else {
                return Ok(None);
            };
            tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", E::TABLE.as_str()),
                [id.to_string()],
            )?;
            tx.commit()?;
            Ok(Some(row))
        })
    }
}

fn select_by_id<E: Entity>(conn: &Connection, id: Uuid) -> Result<Option<E>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        column_list(E::TABLE),
        E::TABLE.as_str()
    );
    let row = conn
        .query_row(&sql, [id.to_string()], |row| E::from_row(row))
        .optional()?;
    Ok(row)
}

fn column_list(table: Table) -> String {
    table
        .columns()
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a validated query. Identifiers come from the static column table,
/// never from the caller; operands are bound as parameters.
fn build_select(query: &ListQuery) -> Result<(String, Vec<SqlValue>)> {
    let table = query.table;
    let mut clauses = Vec::with_capacity(query.filters.len());
    let mut params = Vec::new();

    for filter in &query.filters {
        let Some(column) = table.column(filter.column()) else {
            bail!("unknown column '{}' on '{}'", filter.column(), table);
        };
        match filter {
            Filter::Eq { value, .. } => {
                params.push(match Filter::typed_value(value, column)? {
                    TypedValue::Text(s) => SqlValue::Text(s),
                    TypedValue::Integer(i) => SqlValue::Integer(i),
                    TypedValue::Real(r) => SqlValue::Real(r),
                });
                clauses.push(format!("{} = ?{}", column.name, params.len()));
            }
            Filter::IsNull { .. } => clauses.push(format!("{} IS NULL", column.name)),
            Filter::NotNull { .. } => clauses.push(format!("{} IS NOT NULL", column.name)),
        }
    }

    let Some(order_column) = table.column(&query.order.column) else {
        bail!("unknown order column '{}' on '{}'", query.order.column, table);
    };
    let direction = if query.order.ascending { "ASC" } else { "DESC" };

    let mut sql = format!("SELECT {} FROM {}", column_list(table), table.as_str());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    // rowid breaks timestamp ties in insertion order
    sql.push_str(&format!(
        " ORDER BY {} {dir}, rowid {dir}",
        order_column.name,
        dir = direction
    ));

    Ok((sql, params))
}

fn to_values<T: serde::Serialize>(rows: Vec<T>) -> Result<Vec<Value>> {
    rows.iter()
        .map(|r| serde_json::to_value(r).map_err(Into::into))
        .collect()
}

fn storage_object_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StorageObjectRow> {
    Ok(StorageObjectRow {
        bucket: row.get(0)?,
        key: row.get(1)?,
        content_type: row.get(2)?,
        size: row.get(3)?,
        sha256: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use ybf_types::models::{DonationStatus, PaymentMethod};
    use ybf_types::query::OrderBy;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn announcement(title: &str, offset_secs: i64) -> Announcement {
        Announcement {
            id: Uuid::new_v4(),
            title: title.into(),
            content: format!("{} body", title),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn question(text: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            question: text.into(),
            answer: None,
            answered_at: None,
            created_at: Utc::now(),
        }
    }

    fn testimony(name: &str, approved: bool) -> Testimony {
        Testimony {
            id: Uuid::new_v4(),
            name: name.into(),
            testimony: "changed my life".into(),
            approved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lists_latest_first_by_default() {
        let db = db();
        db.insert_announcement(&announcement("old", -60)).unwrap();
        db.insert_announcement(&announcement("new", 0)).unwrap();
        db.insert_announcement(&announcement("middle", -30)).unwrap();

        let rows: Vec<Announcement> = db.list(&ListQuery::new(Table::Announcements)).unwrap();
        let titles: Vec<_> = rows.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["new", "middle", "old"]);

        let asc: Vec<Announcement> = db
            .list(&ListQuery::new(Table::Announcements).order(OrderBy::asc("created_at")))
            .unwrap();
        assert_eq!(asc[0].title, "old");
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let db = db();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            author_name: "YBF Team".into(),
            image_url: None,
            created_at: Utc::now(),
        };
        db.insert_blog_post(&post).unwrap();

        let at = Utc::now();
        for name in ["first", "second", "third"] {
            db.insert_blog_comment(&BlogComment {
                id: Uuid::new_v4(),
                post_id: post.id,
                name: name.into(),
                comment: "hi".into(),
                created_at: at,
            })
            .unwrap();
        }

        let thread: Vec<BlogComment> = db
            .list(
                &ListQuery::new(Table::BlogComments)
                    .filter(Filter::eq("post_id", post.id.to_string())),
            )
            .unwrap();
        let names: Vec<_> = thread.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn comment_on_missing_post_violates_foreign_key() {
        let db = db();
        let orphan = BlogComment {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            name: "x".into(),
            comment: "y".into(),
            created_at: Utc::now(),
        };
        assert!(db.insert_blog_comment(&orphan).is_err());
    }

    #[test]
    fn bool_filter_selects_approved_testimonies() {
        let db = db();
        db.insert_testimony(&testimony("Grace", true)).unwrap();
        db.insert_testimony(&testimony("Hidden", false)).unwrap();

        let visible: Vec<Testimony> = db
            .list(&ListQuery::new(Table::Testimonies).filter(Filter::eq("approved", "true")))
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Grace");
    }

    #[test]
    fn answering_moves_question_between_lists() {
        let db = db();
        let q = question("When do you meet?");
        db.insert_question(&q).unwrap();

        let unanswered = ListQuery::new(Table::Questions).filter(Filter::is_null("answer"));
        let answered = ListQuery::new(Table::Questions)
            .filter(Filter::not_null("answer"))
            .order(OrderBy::desc("answered_at"));
        assert_eq!(db.list::<Question>(&unanswered).unwrap().len(), 1);
        assert!(db.list::<Question>(&answered).unwrap().is_empty());

        let (before, after) = db
            .answer_question(q.id, "Sundays", Utc::now())
            .unwrap()
            .expect("question exists");
        assert!(before.answer.is_none());
        assert_eq!(after.answer.as_deref(), Some("Sundays"));
        assert!(after.answered_at.is_some());

        assert!(db.list::<Question>(&unanswered).unwrap().is_empty());
        assert_eq!(db.list::<Question>(&answered).unwrap()[0].id, q.id);
    }

    #[test]
    fn updating_missing_question_returns_none() {
        let db = db();
        assert!(db.answer_question(Uuid::new_v4(), "x", Utc::now()).unwrap().is_none());
        assert!(db.edit_question(Uuid::new_v4(), "x").unwrap().is_none());
    }

    #[test]
    fn delete_returns_row_and_leaves_others() {
        let db = db();
        let keep = announcement("keep", 0);
        let gone = announcement("gone", 1);
        db.insert_announcement(&keep).unwrap();
        db.insert_announcement(&gone).unwrap();

        let removed = db.delete_announcement(gone.id).unwrap().expect("row existed");
        assert_eq!(removed.title, "gone");
        assert!(db.delete_announcement(gone.id).unwrap().is_none());

        let rows: Vec<Announcement> = db.list(&ListQuery::new(Table::Announcements)).unwrap();
        assert_eq!(rows, vec![keep]);
    }

    #[test]
    fn list_rejects_mismatched_entity() {
        let db = db();
        let res = db.list::<Book>(&ListQuery::new(Table::Announcements));
        assert!(res.is_err());
    }

    #[test]
    fn list_values_serializes_rows() {
        let db = db();
        db.insert_donation(&Donation {
            id: Uuid::new_v4(),
            donor_name: "Kofi".into(),
            donor_email: "kofi@example.com".into(),
            donor_phone: "0800".into(),
            amount: 2500.0,
            payment_method: PaymentMethod::Ussd,
            status: DonationStatus::Pending,
            transaction_reference: None,
            created_at: Utc::now(),
        })
        .unwrap();

        let rows = db.list_values(&ListQuery::new(Table::Donations)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["payment_method"], "ussd");
        assert_eq!(rows[0]["status"], "pending");
        assert_eq!(rows[0]["amount"], 2500.0);
    }

    #[test]
    fn admin_password_set_then_replace() {
        let db = db();
        assert!(db.get_admin_password("announcement").unwrap().is_none());

        db.set_admin_password("announcement", "hash-1").unwrap();
        db.set_admin_password("announcement", "hash-2").unwrap();

        let row = db.get_admin_password("announcement").unwrap().unwrap();
        assert_eq!(row.password_hash, "hash-2");
    }

    #[test]
    fn referenced_urls_cover_every_url_column() {
        let db = db();
        db.insert_gallery_image(&GalleryImage {
            id: Uuid::new_v4(),
            title: None,
            image_url: "http://x/storage/gallery/a.jpg".into(),
            created_at: Utc::now(),
        })
        .unwrap();
        db.insert_message(&AudioMessage {
            id: Uuid::new_v4(),
            title: "Faith".into(),
            date: "January 2025".into(),
            audio_url: "http://x/storage/messages/b.mp3".into(),
            created_at: Utc::now(),
        })
        .unwrap();

        let urls = db.referenced_urls().unwrap();
        assert!(urls.contains("http://x/storage/gallery/a.jpg"));
        assert!(urls.contains("http://x/storage/messages/b.mp3"));
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn storage_objects_by_age() {
        let db = db();
        let old = StorageObjectRow {
            bucket: "gallery".into(),
            key: "old.jpg".into(),
            content_type: "image/jpeg".into(),
            size: 3,
            sha256: "abc".into(),
            created_at: Utc::now() - Duration::hours(48),
        };
        let fresh = StorageObjectRow {
            key: "fresh.jpg".into(),
            created_at: Utc::now(),
            ..old.clone()
        };
        db.insert_storage_object(&old).unwrap();
        db.insert_storage_object(&fresh).unwrap();

        let stale = db
            .storage_objects_created_before(Utc::now() - Duration::hours(24))
            .unwrap();
        assert_eq!(stale, vec![old.clone()]);

        assert!(db.delete_storage_object("gallery", "old.jpg").unwrap());
        assert!(db.get_storage_object("gallery", "old.jpg").unwrap().is_none());
        assert!(db.get_storage_object("gallery", "fresh.jpg").unwrap().is_some());
    }
}
