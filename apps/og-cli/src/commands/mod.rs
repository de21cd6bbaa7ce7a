pub mod check;
pub mod fetch;
pub mod log;
pub mod rules;
