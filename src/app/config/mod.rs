pub mod info;
pub mod setup;
