/// TOML configuration (`vidya.toml`).
pub mod toml_config;
