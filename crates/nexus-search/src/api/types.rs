//! Jikan API v4 response types.
//!
//! The wire types mirror the JSON the API returns. [`Item`] and [`ItemPage`]
//! are the trimmed-down shapes the controllers work with.

use serde::{Deserialize, Serialize};

/// Generic pagination wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Simple data wrapper (without pagination)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: Option<u32>,
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

/// Character entry as returned by `/characters`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub mal_id: u32,
    pub url: Option<String>,
    pub images: Images,
    pub name: String,
    #[serde(default)]
    pub name_kanji: Option<String>,
    #[serde(default)]
    pub favorites: Option<u32>,
}

/// Anime entry as returned by `/anime` and `/top/anime`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub mal_id: u32,
    pub url: Option<String>,
    pub images: Images,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub members: Option<u32>,
    #[serde(default)]
    pub favorites: Option<u32>,
}

/// Full character profile from `/characters/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub mal_id: u32,
    pub url: Option<String>,
    pub images: Images,
    pub name: String,
    #[serde(default)]
    pub name_kanji: Option<String>,
    #[serde(default)]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub favorites: Option<u32>,
    #[serde(default)]
    pub about: Option<String>,
}

/// Voice actor credit from `/characters/{id}/voices`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCredit {
    pub person: Person,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    pub name: String,
}

/// Anime appearance from `/characters/{id}/anime`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeAppearance {
    pub role: String,
    pub anime: AnimeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeRef {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    pub title: String,
}

/// Image variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Images {
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

/// Error response from Jikan API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanError {
    pub status: u16,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

/// A search result, identical for characters and anime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: u32,
    pub display_name: String,
    pub image_url: Option<String>,
    pub popularity_score: u32,
}

impl From<CharacterEntry> for Item {
    fn from(entry: CharacterEntry) -> Self {
        Self {
            id: entry.mal_id,
            display_name: entry.name,
            image_url: entry.images.jpg.image_url,
            popularity_score: entry.favorites.unwrap_or(0),
        }
    }
}

impl From<AnimeEntry> for Item {
    fn from(entry: AnimeEntry) -> Self {
        Self {
            id: entry.mal_id,
            display_name: entry.title,
            image_url: entry.images.jpg.image_url,
            popularity_score: entry.favorites.unwrap_or(0),
        }
    }
}

/// One page of items plus the pagination metadata the controllers need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub current_page: u32,
    pub has_next_page: bool,
    pub total_items: Option<u32>,
}

impl ItemPage {
    pub(crate) fn from_response<T: Into<Item>>(
        response: PaginatedResponse<T>,
        requested_page: u32,
    ) -> Self {
        let pagination = response.pagination;
        Self {
            items: response.data.into_iter().map(Into::into).collect(),
            current_page: pagination.current_page.unwrap_or(requested_page),
            has_next_page: pagination.has_next_page,
            total_items: pagination.items.map(|items| items.total),
        }
    }
}
