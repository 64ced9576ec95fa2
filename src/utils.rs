pub mod config;
pub mod errors;
pub mod facts;
pub mod numclass_utils;
