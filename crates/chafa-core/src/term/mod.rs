//! Terminal control sequence modeling: a closed sequence vocabulary
//! ([`info`]), environment-based detection ([`db`]), and an input byte
//! buffer ([`fifo`]).

pub mod db;
pub mod fifo;
pub mod info;
