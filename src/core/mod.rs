pub mod drill_down;
pub mod icons;
pub mod services;
pub mod utils;
