//! Data Transfer Objects for REST request/response serialization.

pub mod pairing_dto;

pub use pairing_dto::*;
