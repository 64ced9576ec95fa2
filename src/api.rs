pub mod classify_number;
pub mod version;
