//! Shared application state.

mod settings;
mod store;

pub use settings::{city_center, Settings, Status, CITIES};
pub use store::AppState;
