pub mod admin;
pub mod auth;
pub mod blog;
pub mod companies;
pub mod contact;
pub mod health;
pub mod listings;
pub mod models;
pub mod notifications;
pub mod uploads;
