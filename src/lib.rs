// Library interface, shared by the server binary, integration tests and benchmarks.

pub mod command_line_interface;
pub mod constants;
pub mod database_api;
pub mod database_init;
pub mod database_migrate_refinery;
pub mod deletion_code;
pub mod error;
pub mod file_api;
pub mod html_views;
pub mod internal_api;
pub mod signed_cookie;
pub mod warp_api;
pub mod warp_endpoints;
