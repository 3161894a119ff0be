//! Request descriptions for the Jikan endpoints this crate consumes.
//!
//! A [`RequestSpec`] fully determines the HTTP request, so reissuing it
//! after a rate-limit response repeats the identical request.

/// Category searched by a free-text query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEndpoint {
    Characters,
    Anime,
}

impl SearchEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEndpoint::Characters => "characters",
            SearchEndpoint::Anime => "anime",
        }
    }
}

/// Shape of the items inside a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Character,
    Anime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `/characters?q=` or `/anime?q=`
    Search { endpoint: SearchEndpoint, query: String },
    /// `/characters?order_by=favorites&sort=desc`
    TrendingCharacters,
    /// `/top/anime`
    TopAnime,
    /// `/characters/{id}`
    Character(u32),
    /// `/characters/{id}/voices`
    CharacterVoices(u32),
    /// `/characters/{id}/anime`
    CharacterAnime(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub resource: Resource,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl RequestSpec {
    pub fn search(
        endpoint: SearchEndpoint,
        query: impl Into<String>,
        page: u32,
        limit: u32,
    ) -> Self {
        Self {
            resource: Resource::Search {
                endpoint,
                query: query.into(),
            },
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn trending_characters(page: u32, limit: u32) -> Self {
        Self {
            resource: Resource::TrendingCharacters,
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn top_anime(page: u32, limit: u32) -> Self {
        Self {
            resource: Resource::TopAnime,
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn single(resource: Resource) -> Self {
        Self {
            resource,
            page: None,
            limit: None,
        }
    }

    /// Path relative to the API base URL
    pub fn path(&self) -> String {
        match &self.resource {
            Resource::Search { endpoint, .. } => format!("/{}", endpoint.as_str()),
            Resource::TrendingCharacters => "/characters".to_string(),
            Resource::TopAnime => "/top/anime".to_string(),
            Resource::Character(id) => format!("/characters/{}", id),
            Resource::CharacterVoices(id) => format!("/characters/{}/voices", id),
            Resource::CharacterAnime(id) => format!("/characters/{}/anime", id),
        }
    }

    /// Query parameters in a stable order; values are not percent-encoded.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Resource::Search { query, .. } = &self.resource {
            pairs.push(("q", query.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if self.resource == Resource::TrendingCharacters {
            pairs.push(("order_by", "favorites".to_string()));
            pairs.push(("sort", "desc".to_string()));
        }

        pairs
    }

    /// Item shape for paginated listings, `None` for single-resource lookups
    pub fn item_kind(&self) -> Option<ItemKind> {
        match &self.resource {
            Resource::Search {
                endpoint: SearchEndpoint::Characters,
                ..
            }
            | Resource::TrendingCharacters => Some(ItemKind::Character),
            Resource::Search {
                endpoint: SearchEndpoint::Anime,
                ..
            }
            | Resource::TopAnime => Some(ItemKind::Anime),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())?;
        for (i, (key, value)) in self.query_pairs().iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request() {
        let spec = RequestSpec::search(SearchEndpoint::Characters, "Naruto Uzumaki", 2, 20);
        assert_eq!(spec.path(), "/characters");
        assert_eq!(
            spec.query_pairs(),
            vec![
                ("q", "Naruto Uzumaki".to_string()),
                ("page", "2".to_string()),
                ("limit", "20".to_string()),
            ]
        );
        assert_eq!(spec.item_kind(), Some(ItemKind::Character));
    }

    #[test]
    fn test_trending_characters_sorted_by_favorites() {
        let spec = RequestSpec::trending_characters(1, 20);
        assert_eq!(
            spec.to_string(),
            "/characters?page=1&limit=20&order_by=favorites&sort=desc"
        );
    }

    #[test]
    fn test_detail_paths() {
        assert_eq!(
            RequestSpec::single(Resource::CharacterVoices(17)).to_string(),
            "/characters/17/voices"
        );
        assert_eq!(RequestSpec::single(Resource::Character(17)).item_kind(), None);
        assert_eq!(RequestSpec::top_anime(1, 6).item_kind(), Some(ItemKind::Anime));
    }
}
