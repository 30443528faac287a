// src/models/mod.rs

pub mod audit;
pub mod question;
pub mod quiz;
pub mod subject;
pub mod taken_quiz;
pub mod user;
