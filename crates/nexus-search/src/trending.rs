//! Landing-page listings: most favorited characters and top anime.

use crate::api::{BackoffHttpClient, Item, RequestSpec};
use crate::error::Result;
use crate::join::join_settled;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Trending {
    pub characters: Result<Vec<Item>>,
    pub anime: Result<Vec<Item>>,
}

/// Fetch both listings in parallel; each side fails on its own.
pub async fn fetch_trending(
    client: &BackoffHttpClient,
    characters_limit: u32,
    anime_limit: u32,
) -> Trending {
    info!(characters_limit, anime_limit, "Fetching trending listings");

    let (characters, anime) = join_settled(
        client.execute(&RequestSpec::trending_characters(1, characters_limit)),
        client.execute(&RequestSpec::top_anime(1, anime_limit)),
    )
    .await;

    if let Err(e) = &characters {
        warn!(error = %e, "Trending characters unavailable");
    }
    if let Err(e) = &anime {
        warn!(error = %e, "Top anime unavailable");
    }

    Trending {
        characters: characters.map(|page| page.items),
        anime: anime.map(|page| page.items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BackoffPolicy, RawResponse, Resource, Transport, TransportError};
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct TopAnimeDown;

    #[async_trait]
    impl Transport for TopAnimeDown {
        async fn send(
            &self,
            request: &RequestSpec,
        ) -> std::result::Result<RawResponse, TransportError> {
            match request.resource {
                Resource::TopAnime => Ok(RawResponse::new(503, "")),
                _ => {
                    let body = serde_json::json!({
                        "pagination": { "has_next_page": true },
                        "data": [{
                            "mal_id": 40,
                            "images": { "jpg": { "image_url": null } },
                            "name": "Lelouch Lamperouge",
                            "favorites": 170000,
                        }],
                    });
                    Ok(RawResponse::new(200, body.to_string()))
                }
            }
        }
    }

    #[tokio::test]
    async fn test_one_listing_down() {
        let client = BackoffHttpClient::new(
            Arc::new(TopAnimeDown),
            BackoffPolicy::fixed(3, Duration::from_millis(10)),
            Duration::from_secs(5),
        );

        let trending = fetch_trending(&client, 20, 6).await;

        let characters = trending.characters.unwrap();
        assert_eq!(characters[0].display_name, "Lelouch Lamperouge");
        assert_eq!(characters[0].popularity_score, 170000);
        assert_eq!(trending.anime.unwrap_err(), FetchError::Server { status: 503 });
    }
}
