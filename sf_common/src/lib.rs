mod cents;
mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, AMOUNT_TOLERANCE, DEFAULT_CURRENCY_CODE};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
