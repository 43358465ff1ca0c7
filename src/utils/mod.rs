pub mod json;
pub mod normalize;
