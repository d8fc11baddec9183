pub mod driver;
pub use driver::Driver;

mod error;
pub use error::{Error, IntoError};

pub mod key;

pub mod schema;
pub use schema::Schema;

mod value;
pub use value::{Attributes, Value};

/// A Result type alias that uses Biggie's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
