pub mod registry;
pub mod ws;
