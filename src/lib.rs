/// CharacterForge - RPG character portrait generator
///
/// Core library providing stat rolls, prompt building, portrait
/// generation and collection minting behind a small HTTP API.

pub mod config;
pub mod core;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
