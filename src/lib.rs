pub mod config;
pub mod coverage;
pub mod dbf;
pub mod geo;
pub mod io;
pub mod physics;
pub mod terrain;
