//! Data models shared by every stage of the screening pipeline.

pub mod candidate;
pub mod result;
