pub mod init_config;
pub mod schema;
pub mod sync;
