//! Terminal chrome: app event loop, transcript view, input composer,
//! session picker, slash commands and theming.

pub mod app;
pub mod commands;
pub mod composer;
pub mod picker;
pub mod theme;
pub mod transcript;

pub use app::ChatApp;
