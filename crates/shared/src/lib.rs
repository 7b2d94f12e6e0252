pub mod company;
pub mod domain;
pub mod error;
pub mod protocol;
