pub mod app;
pub mod cli;
pub mod collection;
pub mod config;
pub mod gateway;
pub mod output;
pub mod pagination;
pub mod present;
pub mod resources;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;
