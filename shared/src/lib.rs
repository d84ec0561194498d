pub mod config;
pub mod error;
pub mod log;
pub mod matrix;
pub mod outcome;
pub mod page;
pub mod regional;
pub mod resolver;
pub mod retry;
pub mod s3;
