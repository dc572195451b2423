//! Services module
//!
//! Business logic services that sit between a frontend and the repository.

pub mod items;
pub mod search;
pub mod settings;
pub mod tags;

pub use items::ItemsService;
pub use search::SearchService;
pub use settings::SettingsService;
pub use tags::TagsService;
