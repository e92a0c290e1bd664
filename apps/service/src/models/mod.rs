pub mod check;

pub use check::{Check, CheckState, HttpMethod, Protocol};
