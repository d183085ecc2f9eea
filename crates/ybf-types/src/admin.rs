use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A gated admin capability. Each action has its own password and its own
/// session scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Announcement,
    QaAnswers,
    MessagesGallery,
    BlogCreate,
    BooksUpload,
    Donations,
}

impl AdminAction {
    pub const ALL: [AdminAction; 6] = [
        AdminAction::Announcement,
        AdminAction::QaAnswers,
        AdminAction::MessagesGallery,
        AdminAction::BlogCreate,
        AdminAction::BooksUpload,
        AdminAction::Donations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Announcement => "announcement",
            Self::QaAnswers => "qa_answers",
            Self::MessagesGallery => "messages_gallery",
            Self::BlogCreate => "blog_create",
            Self::BooksUpload => "books_upload",
            Self::Donations => "donations",
        }
    }

    /// Name of the environment variable that seeds this action's password,
    /// e.g. `YBF_ADMIN_PASSWORD_QA_ANSWERS`.
    pub fn password_env_var(&self) -> String {
        format!("YBF_ADMIN_PASSWORD_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|a| a.as_str() == s).ok_or(())
    }
}

/// Session token claims issued by the admin gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The admin action this session is scoped to.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn scope(&self) -> Option<AdminAction> {
        self.sub.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_their_names() {
        for action in AdminAction::ALL {
            assert_eq!(action.as_str().parse::<AdminAction>(), Ok(action));
        }
        assert!("BOOKS".parse::<AdminAction>().is_err());
    }

    #[test]
    fn env_var_name_is_uppercased() {
        assert_eq!(
            AdminAction::MessagesGallery.password_env_var(),
            "YBF_ADMIN_PASSWORD_MESSAGES_GALLERY"
        );
    }
}
