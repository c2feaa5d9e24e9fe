pub mod activity;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;
