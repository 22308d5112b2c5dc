//! Room creation and joining.

use serde_json::json;
use uno_core::docs::{Player, RoomDoc, RoomId};
use uno_core::error::{AppError, StoreError};
use uno_core::store::{DocKey, DocumentStore, decode, encode};

use crate::auth::Identity;

/// Generated keys tried before giving up on finding a free one.
pub const CREATE_ATTEMPTS: usize = 5;

/// Create an empty room under a fresh key and return the key.
pub async fn create_room<S: DocumentStore>(store: &S) -> Result<RoomId, AppError> {
    for _ in 0..CREATE_ATTEMPTS {
        let room_id = RoomId::generate();
        let key = DocKey::room(&room_id);
        if store.fetch(&key).recv().await?.is_some() {
            tracing::debug!(room = %room_id, "generated key already taken");
            continue;
        }
        store
            .write(&key, encode(&RoomDoc::new(room_id.clone()))?)
            .recv()
            .await?;
        tracing::info!(room = %room_id, "room created");
        return Ok(room_id);
    }
    Err(StoreError::Unavailable("no free room key".into()).into())
}

/// Seat `identity` in `room_id`: writes the player document, then adds the
/// player to the room's `players`. Joining a room twice is a no-op.
pub async fn join_room<S: DocumentStore>(
    store: &S,
    room_id: &RoomId,
    identity: &Identity,
) -> Result<RoomDoc, AppError> {
    let key = DocKey::room(room_id);
    let Some(value) = store.fetch(&key).recv().await? else {
        return Err(AppError::NotFound {
            room_id: room_id.clone(),
        });
    };
    let mut room: RoomDoc = decode(&key, value)?;
    if room.has_player(&identity.uid) {
        return Ok(room);
    }

    let player = Player {
        uid: identity.uid.clone(),
        username: identity.profile.username.clone(),
        pfp: identity.profile.pfp,
        room_id: room_id.clone(),
        cards: Vec::new(),
    };
    store
        .write(&DocKey::player(room_id, &player.uid), encode(&player)?)
        .recv()
        .await?;

    // Merge patches replace arrays wholesale, so send the full seat list.
    room.players.push(player);
    store
        .write(&key, json!({ "players": encode(&room.players)? }))
        .recv()
        .await?;
    tracing::info!(room = %room_id, uid = %identity.uid, "joined room");
    Ok(room)
}
