pub mod alias;
pub mod application;
pub mod barrier;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod identifier;
pub mod process;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod sink;
pub mod surface;
