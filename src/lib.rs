pub mod auth;
pub mod cache;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod payments;
pub mod realtime;
pub mod receipts;
pub mod services;

pub use db::create_pool;
