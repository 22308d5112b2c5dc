pub mod actions;
pub mod auth;
pub mod landing;
pub mod remote;
pub mod session;
pub mod transport;

#[cfg(feature = "native")]
pub mod ws_transport;
