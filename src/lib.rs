pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod storage;
pub mod types;

pub use error::DirectoryError;
pub use service::SchoolService;
