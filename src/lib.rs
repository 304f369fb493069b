pub mod ant;
pub mod components;
pub mod config;
pub mod context;
pub mod decay;
pub mod geometry;
pub mod grid;
pub mod pheromones;
pub mod planner;
pub mod systems;
