// src/users/mod.rs

pub mod store;
pub mod types;

pub use store::{NewUser, ProfileUpdate, UserStore};
pub use types::{Provider, Role, User, UserResponse};
