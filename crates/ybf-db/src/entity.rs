use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use ybf_types::models::{
    Announcement, AudioMessage, BlogComment, BlogPost, Book, BookReview, ContactSubmission,
    Donation, GalleryImage, Question, Testimony,
};
use ybf_types::query::Table;

/// A content row that can be read by the generic list.
///
/// `from_row` reads columns in the order of `Self::TABLE.columns()`.
pub trait Entity: Sized {
    const TABLE: Table;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_at<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{}'", raw).into(),
        )
    })
}

impl Entity for Announcement {
    const TABLE: Table = Table::Announcements;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl Entity for Question {
    const TABLE: Table = Table::Questions;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            question: row.get(3)?,
            answer: row.get(4)?,
            answered_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl Entity for Testimony {
    const TABLE: Table = Table::Testimonies;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            testimony: row.get(2)?,
            approved: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl Entity for BlogPost {
    const TABLE: Table = Table::BlogPosts;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            author_name: row.get(3)?,
            image_url: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl Entity for BlogComment {
    const TABLE: Table = Table::BlogComments;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            post_id: uuid_at(row, 1)?,
            name: row.get(2)?,
            comment: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl Entity for Book {
    const TABLE: Table = Table::Books;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            description: row.get(3)?,
            cover_image_url: row.get(4)?,
            file_url: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl Entity for BookReview {
    const TABLE: Table = Table::BookReviews;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            book_id: uuid_at(row, 1)?,
            user_name: row.get(2)?,
            review: row.get(3)?,
            rating: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl Entity for GalleryImage {
    const TABLE: Table = Table::GalleryImages;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            title: row.get(1)?,
            image_url: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl Entity for AudioMessage {
    const TABLE: Table = Table::Messages;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            title: row.get(1)?,
            date: row.get(2)?,
            audio_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl Entity for Donation {
    const TABLE: Table = Table::Donations;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            donor_name: row.get(1)?,
            donor_email: row.get(2)?,
            donor_phone: row.get(3)?,
            amount: row.get(4)?,
            payment_method: parsed_at(row, 5)?,
            status: parsed_at(row, 6)?,
            transaction_reference: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl Entity for ContactSubmission {
    const TABLE: Table = Table::ContactSubmissions;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            message: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
