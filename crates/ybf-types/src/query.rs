use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::admin::AdminAction;
use crate::events::ChangeEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: &'static str, column: String },
    #[error("invalid filter '{0}'")]
    InvalidFilter(String),
    #[error("invalid value '{value}' for column '{column}'")]
    InvalidValue { column: String, value: String },
    #[error("invalid order '{0}'")]
    InvalidOrder(String),
}

/// Content tables exposed through lists and the realtime feed.
/// `admin_passwords` and `storage_objects` are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Announcements,
    Questions,
    Testimonies,
    BlogPosts,
    BlogComments,
    Books,
    BookReviews,
    GalleryImages,
    Messages,
    Donations,
    ContactSubmissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Bool,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

use ColumnKind::{Bool, Integer, Real, Text, Timestamp};

const ANNOUNCEMENTS: &[Column] = &[
    col("id", Text),
    col("title", Text),
    col("content", Text),
    col("created_at", Timestamp),
];
const QUESTIONS: &[Column] = &[
    col("id", Text),
    col("name", Text),
    col("email", Text),
    col("question", Text),
    col("answer", Text),
    col("answered_at", Timestamp),
    col("created_at", Timestamp),
];
const TESTIMONIES: &[Column] = &[
    col("id", Text),
    col("name", Text),
    col("testimony", Text),
    col("approved", Bool),
    col("created_at", Timestamp),
];
const BLOG_POSTS: &[Column] = &[
    col("id", Text),
    col("title", Text),
    col("content", Text),
    col("author_name", Text),
    col("image_url", Text),
    col("created_at", Timestamp),
];
const BLOG_COMMENTS: &[Column] = &[
    col("id", Text),
    col("post_id", Text),
    col("name", Text),
    col("comment", Text),
    col("created_at", Timestamp),
];
const BOOKS: &[Column] = &[
    col("id", Text),
    col("title", Text),
    col("author", Text),
    col("description", Text),
    col("cover_image_url", Text),
    col("file_url", Text),
    col("created_at", Timestamp),
];
const BOOK_REVIEWS: &[Column] = &[
    col("id", Text),
    col("book_id", Text),
    col("user_name", Text),
    col("review", Text),
    col("rating", Integer),
    col("created_at", Timestamp),
];
const GALLERY_IMAGES: &[Column] = &[
    col("id", Text),
    col("title", Text),
    col("image_url", Text),
    col("created_at", Timestamp),
];
const MESSAGES: &[Column] = &[
    col("id", Text),
    col("title", Text),
    col("date", Text),
    col("audio_url", Text),
    col("created_at", Timestamp),
];
const DONATIONS: &[Column] = &[
    col("id", Text),
    col("donor_name", Text),
    col("donor_email", Text),
    col("donor_phone", Text),
    col("amount", Real),
    col("payment_method", Text),
    col("status", Text),
    col("transaction_reference", Text),
    col("created_at", Timestamp),
];
const CONTACT_SUBMISSIONS: &[Column] = &[
    col("id", Text),
    col("name", Text),
    col("email", Text),
    col("message", Text),
    col("created_at", Timestamp),
];

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Announcements,
        Table::Questions,
        Table::Testimonies,
        Table::BlogPosts,
        Table::BlogComments,
        Table::Books,
        Table::BookReviews,
        Table::GalleryImages,
        Table::Messages,
        Table::Donations,
        Table::ContactSubmissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Announcements => "announcements",
            Self::Questions => "questions",
            Self::Testimonies => "testimonies",
            Self::BlogPosts => "blog_posts",
            Self::BlogComments => "blog_comments",
            Self::Books => "books",
            Self::BookReviews => "book_reviews",
            Self::GalleryImages => "gallery_images",
            Self::Messages => "messages",
            Self::Donations => "donations",
            Self::ContactSubmissions => "contact_submissions",
        }
    }

    /// Columns in select order.
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Self::Announcements => ANNOUNCEMENTS,
            Self::Questions => QUESTIONS,
            Self::Testimonies => TESTIMONIES,
            Self::BlogPosts => BLOG_POSTS,
            Self::BlogComments => BLOG_COMMENTS,
            Self::Books => BOOKS,
            Self::BookReviews => BOOK_REVIEWS,
            Self::GalleryImages => GALLERY_IMAGES,
            Self::Messages => MESSAGES,
            Self::Donations => DONATIONS,
            Self::ContactSubmissions => CONTACT_SUBMISSIONS,
        }
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// Feeds are latest-first; comment threads read top to bottom.
    pub fn default_order(&self) -> OrderBy {
        match self {
            Self::BlogComments => OrderBy::asc("created_at"),
            _ => OrderBy::desc("created_at"),
        }
    }

    /// Scope a reader must hold to list or subscribe to this table.
    /// `None` means the table is publicly readable.
    pub fn read_scope(&self) -> Option<AdminAction> {
        match self {
            Self::Questions => Some(AdminAction::QaAnswers),
            Self::Donations | Self::ContactSubmissions => Some(AdminAction::Donations),
            _ => None,
        }
    }

    /// Filter forced onto public readers of this table.
    pub fn public_filter(&self) -> Option<Filter> {
        match self {
            Self::Testimonies => Some(Filter::eq("approved", "true")),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| QueryError::UnknownTable(s.to_string()))
    }
}

/// A scalar filter value coerced to the column's storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

/// Row filter, written in PostgREST style: `col=eq.value`, `col=is.null`,
/// `col=not.is.null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    IsNull { column: String },
    NotNull { column: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull {
            column: column.into(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidFilter(s.to_string());
        let (column, op) = s.split_once('=').ok_or_else(invalid)?;
        let column = column.trim();
        if column.is_empty() {
            return Err(invalid());
        }

        match op {
            "is.null" => Ok(Self::is_null(column)),
            "not.is.null" => Ok(Self::not_null(column)),
            _ => {
                let value = op.strip_prefix("eq.").ok_or_else(invalid)?;
                Ok(Self::eq(column, value))
            }
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::IsNull { column } | Self::NotNull { column } => column,
        }
    }

    /// Coerce an `eq` operand to the column's storage type.
    pub fn typed_value(value: &str, column: &Column) -> Result<TypedValue, QueryError> {
        let invalid = || QueryError::InvalidValue {
            column: column.name.to_string(),
            value: value.to_string(),
        };
        match column.kind {
            ColumnKind::Text | ColumnKind::Timestamp => Ok(TypedValue::Text(value.to_string())),
            ColumnKind::Integer => value.parse().map(TypedValue::Integer).map_err(|_| invalid()),
            ColumnKind::Real => value.parse().map(TypedValue::Real).map_err(|_| invalid()),
            ColumnKind::Bool => match value {
                "true" => Ok(TypedValue::Integer(1)),
                "false" => Ok(TypedValue::Integer(0)),
                _ => Err(invalid()),
            },
        }
    }

    /// Evaluate against a serialized row.
    pub fn matches(&self, record: &Value) -> bool {
        let field = record.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::IsNull { .. } => field.is_null(),
            Self::NotNull { .. } => !field.is_null(),
            Self::Eq { value, .. } => match field {
                Value::String(s) => s == value,
                Value::Bool(b) => value.parse::<bool>().is_ok_and(|v| v == *b),
                Value::Number(n) => match (n.as_f64(), value.parse::<f64>()) {
                    (Some(a), Ok(b)) => a == b,
                    _ => false,
                },
                _ => false,
            },
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, value } => write!(f, "{}=eq.{}", column, value),
            Self::IsNull { column } => write!(f, "{}=is.null", column),
            Self::NotNull { column } => write!(f, "{}=not.is.null", column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Parses `column.asc` or `column.desc`.
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        match s.rsplit_once('.') {
            Some((column, "asc")) if !column.is_empty() => Ok(Self::asc(column)),
            Some((column, "desc")) if !column.is_empty() => Ok(Self::desc(column)),
            _ => Err(QueryError::InvalidOrder(s.to_string())),
        }
    }
}

/// A full-list fetch: one table, optional filters, one ordering column.
///
/// The same descriptor drives the SQL list, realtime event matching and live
/// collections, so a subscriber refetches exactly the list it displays.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: OrderBy,
}

impl ListQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: table.default_order(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    /// Check every referenced column exists and every operand fits its column.
    pub fn validate(&self) -> Result<(), QueryError> {
        let table = self.table;
        let lookup = |name: &str| {
            table.column(name).ok_or_else(|| QueryError::UnknownColumn {
                table: table.as_str(),
                column: name.to_string(),
            })
        };

        for filter in &self.filters {
            let column = lookup(filter.column())?;
            if let Filter::Eq { value, .. } = filter {
                Filter::typed_value(value, column)?;
            }
        }
        lookup(&self.order.column)?;
        Ok(())
    }

    /// Whether a change can affect this list: same table, and the filters hold
    /// on either the new or the previous version of the row.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        let holds = |record: &Value| self.filters.iter().all(|f| f.matches(record));
        holds(&event.record) || event.old_record.as_ref().is_some_and(holds)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::events::{ChangeEvent, ChangeKind};

    fn event(table: Table, record: Value, old_record: Option<Value>) -> ChangeEvent {
        ChangeEvent {
            table,
            kind: if old_record.is_some() {
                ChangeKind::Update
            } else {
                ChangeKind::Insert
            },
            record,
            old_record,
            commit_timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn parses_postgrest_filters() {
        assert_eq!(
            Filter::parse("post_id=eq.abc").unwrap(),
            Filter::eq("post_id", "abc")
        );
        assert_eq!(Filter::parse("answer=is.null").unwrap(), Filter::is_null("answer"));
        assert_eq!(
            Filter::parse("answer=not.is.null").unwrap(),
            Filter::not_null("answer")
        );
        assert!(Filter::parse("answer").is_err());
        assert!(Filter::parse("=eq.x").is_err());
        assert!(Filter::parse("title=like.x").is_err());
    }

    #[test]
    fn filter_display_round_trips() {
        let filter = Filter::eq("approved", "true");
        assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
    }

    #[test]
    fn eq_matches_json_types() {
        let row = json!({"approved": true, "rating": 4, "post_id": "p1", "answer": null});
        assert!(Filter::eq("approved", "true").matches(&row));
        assert!(!Filter::eq("approved", "false").matches(&row));
        assert!(Filter::eq("rating", "4").matches(&row));
        assert!(Filter::eq("post_id", "p1").matches(&row));
        assert!(!Filter::eq("answer", "null").matches(&row));
        assert!(Filter::is_null("answer").matches(&row));
        assert!(Filter::is_null("missing").matches(&row));
        assert!(Filter::not_null("post_id").matches(&row));
    }

    #[test]
    fn validate_rejects_unknown_columns_and_bad_values() {
        let ok = ListQuery::new(Table::Testimonies).filter(Filter::eq("approved", "true"));
        assert!(ok.validate().is_ok());

        let bad_col = ListQuery::new(Table::Testimonies).filter(Filter::eq("secret", "1"));
        assert!(matches!(bad_col.validate(), Err(QueryError::UnknownColumn { .. })));

        let bad_val = ListQuery::new(Table::Testimonies).filter(Filter::eq("approved", "yes"));
        assert!(matches!(bad_val.validate(), Err(QueryError::InvalidValue { .. })));

        let bad_order = ListQuery::new(Table::Books).order(OrderBy::desc("password_hash"));
        assert!(bad_order.validate().is_err());
    }

    #[test]
    fn order_parses_direction() {
        assert_eq!(OrderBy::parse("created_at.asc").unwrap(), OrderBy::asc("created_at"));
        assert_eq!(
            OrderBy::parse("answered_at.desc").unwrap(),
            OrderBy::desc("answered_at")
        );
        assert!(OrderBy::parse("created_at").is_err());
        assert!(OrderBy::parse(".asc").is_err());
    }

    #[test]
    fn default_orders() {
        assert!(Table::BlogComments.default_order().ascending);
        assert!(!Table::Announcements.default_order().ascending);
    }

    #[test]
    fn query_matches_rows_leaving_the_filter() {
        let unanswered = ListQuery::new(Table::Questions).filter(Filter::is_null("answer"));

        let answered = event(
            Table::Questions,
            json!({"answer": "yes"}),
            Some(json!({"answer": null})),
        );
        assert!(unanswered.matches(&answered));

        let other_table = event(Table::Announcements, json!({"answer": null}), None);
        assert!(!unanswered.matches(&other_table));

        let edit_of_answered = event(
            Table::Questions,
            json!({"answer": "b"}),
            Some(json!({"answer": "a"})),
        );
        assert!(!unanswered.matches(&edit_of_answered));
    }
}
