pub mod bounds;
pub mod controller;
pub mod nearest;
