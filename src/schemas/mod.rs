pub mod authoring;
pub mod report;
