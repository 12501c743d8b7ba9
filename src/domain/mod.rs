//! Domain types shared by the resolver and its stores.

pub mod entities;
pub mod identifier;
