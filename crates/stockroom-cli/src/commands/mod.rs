pub mod add;
pub mod auth;
pub mod category;
pub mod common;
pub mod completions;
pub mod config;
pub mod customer;
pub mod delete;
pub mod edit;
pub mod list;
pub mod order;
pub mod product;
pub mod supply;
pub mod sync;
