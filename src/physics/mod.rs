pub mod los;
pub mod refraction;
pub mod slope;
