pub mod account;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod token;
pub mod validate;
