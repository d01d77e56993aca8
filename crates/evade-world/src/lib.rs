pub mod challenge;
pub mod character;
pub mod maps;
pub mod pathfinding;
pub mod threats;
pub mod tiles;
pub mod world;

pub use challenge::{Challenge, EngineError};
pub use maps::MapLoader;
pub use world::World;
