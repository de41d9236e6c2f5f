pub mod category;
pub mod credit_card;
pub mod request;
pub mod settings;
pub mod summary;
pub mod transaction;
