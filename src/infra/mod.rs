//! Infrastructure adapters and runtime bootstrap.

pub mod clients;
pub mod cms;
pub mod crm;
pub mod error;
pub mod http;
pub mod kv;
pub mod telemetry;
