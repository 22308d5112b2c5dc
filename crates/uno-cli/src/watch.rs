//! Sign in, land on a room and print it as it changes.

use std::fmt::Write as _;

use uno_client::actions::{create_room, join_room};
use uno_client::auth::{AuthProvider, submit_username};
use uno_client::landing::{RoomLanding, Router};
use uno_client::remote::RemoteStore;
use uno_client::session::connect_with_retry;
use uno_core::docs::{Pfp, RoomId};
use uno_core::docs_context::{DocsContext, DocsState};
use uno_core::guard::{GuardDecision, Route, View};
use uno_core::presentation::{CardBack, PlayerCardView};
use uno_core::username::UsernameForm;

pub struct WatchOptions {
    pub server: String,
    pub room: Option<String>,
    pub name: Option<String>,
    pub pfp: Option<String>,
    pub create: bool,
    pub join: bool,
}

/// Prints redirects instead of changing a URL.
struct PrintRouter;

impl Router for PrintRouter {
    fn navigate(&self, route: &Route) {
        println!("→ {route}");
    }
}

pub async fn run(options: WatchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let ws_url = if options.server.ends_with("/ws") {
        options.server.clone()
    } else {
        format!("{}/ws", options.server.trim_end_matches('/'))
    };
    let store = connect_with_retry(&ws_url, |ms| {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms))
    })
    .await?;

    let room_id = if options.create {
        let room_id = create_room(&store).await?;
        println!("Created room {room_id}");
        room_id
    } else {
        let raw = options.room.as_deref().ok_or("--room is required unless --create is set")?;
        RoomId::parse(raw)?
    };

    let uid = if options.join || options.create {
        let form = UsernameForm {
            username: options.name.clone().unwrap_or_default(),
            pfp: options.pfp.as_deref().and_then(Pfp::from_name),
        };
        let identity = submit_username(&form, &store).await?;
        join_room(&store, &room_id, &identity).await?;
        identity.uid
    } else {
        store.sign_in().await?
    };

    watch_room(store, room_id, uid).await
}

async fn watch_room(
    store: RemoteStore,
    room_id: RoomId,
    uid: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut docs = DocsContext::new(store.clone());
    let mut landing = RoomLanding::new(store, PrintRouter, room_id.clone(), uid.as_str());

    tokio::select! {
        _ = landing.settle(&mut docs) => {}
        _ = tokio::signal::ctrl_c() => return Ok(()),
    }
    loop {
        match landing.decision() {
            GuardDecision::InvalidRoom => {
                return Err(format!("Room {room_id} does not exist").into());
            }
            GuardDecision::Failed(err) => return Err(err.clone().into()),
            GuardDecision::Navigate(Route::Room {
                view: View::Game, ..
            }) => docs.subscribe_player(&uid, &room_id),
            GuardDecision::Navigate(_) => docs.unsubscribe_player(),
            GuardDecision::Wait => {}
        }
        print!("{}", render(docs.state(), &uid));

        tokio::select! {
            _ = docs.recv() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
        landing.update(&mut docs);
    }
}

/// Text rendering of the mirrored room for the terminal.
fn render(state: &DocsState, our_uid: &str) -> String {
    let mut out = String::new();
    let Some(room) = &state.room.doc else {
        if state.room.loading {
            out.push_str("Loading room…\n");
        }
        return out;
    };

    let _ = writeln!(
        out,
        "Room {}  {}  {}",
        room.room_id,
        if room.started { "in play" } else { "waiting to start" },
        room.current_direction.arrow()
    );
    if let Some(card) = &room.current_card {
        let _ = writeln!(out, "Table: {card}");
    }
    for player in &room.players {
        let view = PlayerCardView::new(player, Some(room));
        let backs: String = view
            .footer
            .backs
            .iter()
            .map(|back| match back {
                CardBack::Full => '█',
                CardBack::Partial => '▌',
            })
            .collect();
        let _ = writeln!(
            out,
            "{} {:<16} {:<8} {backs} {}{}",
            if view.has_turn { '▶' } else { ' ' },
            view.username,
            view.avatar_alt,
            view.footer.count_text(),
            if view.uid == our_uid { "  (you)" } else { "" },
        );
    }
    if let Some(me) = &state.player.doc {
        let hand: Vec<String> = me.cards.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Your hand: {}", hand.join(", "));
    }
    out
}
