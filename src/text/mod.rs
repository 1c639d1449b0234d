//! String transforms and validators.
//!
//! Everything here is pure and total: no function panics or returns an
//! error for any `&str` input.

pub mod censor;
pub mod format;
pub mod validate;

pub use censor::{censor_email, censor_full_name, censor_phone, censor_word};
pub use format::{camel_to_snake, capitalize, slugify, snake_to_camel, to_title_case, truncate};
pub use validate::{is_alphabetic, is_alphanumeric, is_valid_email, is_valid_phone_number};
