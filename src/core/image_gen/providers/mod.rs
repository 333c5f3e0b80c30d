pub mod stability;

pub use stability::StabilityProvider;
