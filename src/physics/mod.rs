// src/physics/mod.rs
pub mod bonding;
pub mod coord_sequence;
pub mod open_site;
pub mod sphere;
