//! Clipboard bridge relay: the notification router, its client and operator
//! transports, the event workers and the HTTP surface.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod clients;
pub mod router;
pub mod state;
pub mod telegram;
pub mod transport;
pub mod workers;
