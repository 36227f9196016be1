//! Data Transfer Objects for the Filedrop API.

pub mod response;

pub use response::*;
