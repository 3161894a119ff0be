//! Character detail page data.

use crate::api::{
    AnimeAppearance, BackoffHttpClient, CharacterProfile, RequestSpec, Resource, VoiceCredit,
};
use crate::error::Result;
use crate::join::join_settled3;
use tracing::{info, warn};

#[derive(Debug)]
pub struct CharacterDetail {
    pub profile: CharacterProfile,
    pub voices: Result<Vec<VoiceCredit>>,
    pub appearances: Result<Vec<AnimeAppearance>>,
}

/// Load a character's profile, voice actors and anime appearances in parallel.
///
/// Fails only when the profile itself cannot be loaded.
pub async fn load_character_detail(
    client: &BackoffHttpClient,
    character_id: u32,
) -> Result<CharacterDetail> {
    info!(character_id, "Loading character detail");

    let profile_request = RequestSpec::single(Resource::Character(character_id));
    let voices_request = RequestSpec::single(Resource::CharacterVoices(character_id));
    let anime_request = RequestSpec::single(Resource::CharacterAnime(character_id));

    let (profile, voices, appearances) = join_settled3(
        client.fetch_data::<CharacterProfile>(&profile_request),
        client.fetch_data::<Vec<VoiceCredit>>(&voices_request),
        client.fetch_data::<Vec<AnimeAppearance>>(&anime_request),
    )
    .await;

    if let Err(e) = &voices {
        warn!(character_id, error = %e, "Voice actors unavailable");
    }
    if let Err(e) = &appearances {
        warn!(character_id, error = %e, "Anime appearances unavailable");
    }

    Ok(CharacterDetail {
        profile: profile?,
        voices,
        appearances,
    })
}
