//! Helper functions shared by the generator, templates and server

mod date;

pub use date::*;
