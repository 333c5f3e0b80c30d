pub mod api;
pub mod character_gen;
pub mod collection;
pub mod image_gen;
pub mod logging;
