pub mod companion;
pub mod config;
pub mod display;
pub mod host;
pub mod message;
pub mod persist;
pub mod reconcile;
pub mod retry;
pub mod sim;
pub mod state;
pub mod tap;
#[cfg(test)]
mod testing;
pub mod util;
pub mod view;
pub mod watchface;
pub mod weather;
