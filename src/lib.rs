pub mod core;
pub mod grading;
pub mod model;
pub mod review;
pub mod schemas;

#[cfg(test)]
mod test_support;
