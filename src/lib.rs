//! Library crate for trivia-rooms-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod question_supply;
pub mod routes;
pub mod services;
pub mod state;
