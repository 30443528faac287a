// src/handlers/mod.rs

pub mod api;
pub mod auth;
pub mod question;
pub mod student;
pub mod subject;
pub mod teacher;
