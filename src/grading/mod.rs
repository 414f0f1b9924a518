pub mod aggregate;
pub mod grade;
pub mod normalize;
