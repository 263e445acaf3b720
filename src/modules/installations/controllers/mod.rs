pub mod installation_controller;

pub use installation_controller::configure;
