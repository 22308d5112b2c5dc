pub mod card_footer;
pub mod choose_username;
pub mod game_screen;
pub mod notices;
pub mod player_card;
pub mod room_entry;
pub mod room_landing;
