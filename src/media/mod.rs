pub mod error;
pub mod paths;
pub mod probe;
pub mod service;
pub mod walk;
