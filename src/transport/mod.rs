//! Newline-delimited JSON over TCP. Each stage runs in its own task and
//! talks to the next one over a channel.
pub mod accepting;
pub mod connection;
pub mod msg_handling;
pub mod protocol;
pub mod reading;
pub mod responding;
