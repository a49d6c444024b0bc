pub mod dot;
pub mod traits;
