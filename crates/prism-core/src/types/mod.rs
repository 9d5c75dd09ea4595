pub mod block;
pub mod params;
