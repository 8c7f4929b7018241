//! The meme backend as the editor and gallery see it.
//!
//! [`MemeApi`] is blocking; callers run it on a background task (see
//! [`crate::task`]) and poll the result from the UI thread.

mod client;

pub use client::{HttpMemeApi, parse_meme, parse_page};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::ExportArtifact;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("request failed: {0}")]
    Request(String),

    /// Non-success status; `message` is the server's own text when it sent one
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Backend ids arrive as numbers or strings depending on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemeId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemeId::Number(n) => write!(f, "{n}"),
            MemeId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meme {
    pub id: MemeId,
    pub title: String,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
}

impl Meme {
    /// Calendar date of creation for display
    pub fn created_label(&self) -> String {
        match self.created_at.as_deref().map(str::trim) {
            Some(stamp) if !stamp.is_empty() => stamp.split('T').next().unwrap_or(stamp).to_owned(),
            _ => "Unknown date".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemePage {
    pub items: Vec<Meme>,
    pub total_pages: u32,
}

/// Sort order by creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortDirection::Asc => "Oldest",
            SortDirection::Desc => "Newest",
        }
    }
}

/// One page request; `page` is zero-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub size: u32,
    pub search: String,
    pub sort: SortDirection,
}

impl ListQuery {
    pub fn first_page(size: u32) -> Self {
        Self {
            page: 0,
            size,
            search: String::new(),
            sort: SortDirection::Desc,
        }
    }
}

pub trait MemeApi: Send + Sync {
    fn list_memes(&self, query: &ListQuery) -> Result<MemePage, ApiError>;

    /// Upload `file` under `title`
    fn create_meme(&self, file: &ExportArtifact, title: &str) -> Result<Meme, ApiError>;

    fn delete_meme(&self, id: &MemeId) -> Result<(), ApiError>;

    /// Raw bytes behind an image URL
    fn download(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}
