// src/utils/mod.rs

pub mod audit;
pub mod client_ip;
pub mod fixtures;
pub mod hash;
pub mod html;
pub mod import;
pub mod jwt;
