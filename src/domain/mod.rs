pub mod customer;
pub mod error;
pub mod facility;
pub mod types;

pub use customer::*;
pub use error::*;
pub use facility::*;
pub use types::*;
