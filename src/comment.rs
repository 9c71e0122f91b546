use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A guest comment kept in the visitor's session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u32,
    pub content: String,
    pub name: String,
    pub web: String,
    pub mail: String,
    pub gravatar: String,
    pub timestamp: i64,
    pub ip: Option<String>,
    pub page_key: String,
}

/// Pages whose comments are persisted, each backed by its own table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentPage {
    Comments1,
    Comments2,
}

impl CommentPage {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Comments1 => "comments1",
            Self::Comments2 => "comments2",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Comments1 => "Anax-MVC kommentarsida 1",
            Self::Comments2 => "Anax-MVC kommentarsida 2",
        }
    }
}

impl FromStr for CommentPage {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comments1" => Ok(Self::Comments1),
            "comments2" => Ok(Self::Comments2),
            other => Err(UnknownPage(other.to_string())),
        }
    }
}

impl fmt::Display for CommentPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPage(pub String);

impl fmt::Display for UnknownPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Okänd kommentarsida: {}", self.0)
    }
}

/// Title shown above the comment forms, only known pages have one.
pub fn page_title(page_key: &str) -> Option<&'static str> {
    page_key.parse::<CommentPage>().ok().map(|p| p.title())
}

pub fn gravatar_url(mail: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(mail.trim().to_lowercase().as_bytes());
    format!("http://www.gravatar.com/avatar/{:x}.jpg", hasher.finalize())
}

pub fn not_found_message(id: impl fmt::Display) -> String {
    format!("Kunde inte finna kommentar med id {}", id)
}
