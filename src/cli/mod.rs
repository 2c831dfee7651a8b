pub mod auth_cmd;
pub mod config_cmd;
pub mod context;
pub mod dashboard_cmd;
pub mod output;
pub mod renderer;
pub mod settings_cmd;
