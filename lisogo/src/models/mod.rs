//! Models of lisogo.
//!
//! A user defines a list of goals, called objectives, each one associated
//! to an item. An objective is personal whereas an item can be shared by
//! several users.

mod item;
mod objective;
mod user;

pub use item::{Item, TITLE_MAX_LENGTH};
pub use objective::Objective;
pub use user::User;
