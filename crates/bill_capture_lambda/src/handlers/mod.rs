pub mod auth;
pub mod bill;
pub mod bills;
pub mod categorize;
pub mod extract;
pub mod http;
pub mod sqs;
pub mod upload;
