pub mod cache;
pub mod farmer;
pub mod grant;
