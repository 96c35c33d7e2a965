pub mod server;

pub mod db;
pub mod drive;
pub mod search;

pub mod client;
pub mod web;

pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
