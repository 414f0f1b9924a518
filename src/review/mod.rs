pub mod correction;
pub mod editable;
pub mod format;
