pub mod config;
pub mod environment;
pub mod models;
pub mod page;
pub mod reporter;
pub mod session;

#[cfg(test)]
mod tests;
