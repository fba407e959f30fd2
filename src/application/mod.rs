pub mod contact;
pub mod error;
pub mod fallback;
pub mod kv_content;
pub mod repos;
pub mod resolver;
pub mod revalidation;
pub mod sources;
