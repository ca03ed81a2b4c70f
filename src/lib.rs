//! Client for a download-queue server: keeps a local copy of the server's
//! queue in sync over a Socket.IO channel and projects it onto a surface.

pub mod api;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod i18n;
pub mod model;
pub mod notices;
pub mod probe;
pub mod repl;
pub mod settings;
pub mod store;
pub mod term;
pub mod transport;
pub mod view;
