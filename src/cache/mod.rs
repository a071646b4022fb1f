pub mod aura;
pub mod image;
pub mod inflight;

pub use aura::AuraCache;
pub use image::{cache_key, CacheTier, ImageCache};
pub use inflight::{FlightSlot, Inflight};
