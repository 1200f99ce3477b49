mod fingerprint;
mod person;
mod token;
mod user;

pub use fingerprint::*;
pub use person::*;
pub use token::*;
pub use user::*;
