pub mod batch;
pub mod check_config;
pub mod run;
pub mod summary;
