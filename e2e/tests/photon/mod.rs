mod drain;
mod properties;
mod world;

pub use world::PhotonWorld;
