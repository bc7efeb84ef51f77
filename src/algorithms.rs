pub mod evaluation;
pub mod integration;
