pub mod admin;
pub mod auth;
pub mod data;
pub mod gate;
pub mod models;
pub mod public;
pub mod responses;
pub mod router;
pub mod state;
pub mod templates;

pub use responses::Xml;
pub use state::AppState;
