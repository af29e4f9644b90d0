pub mod budget;
pub mod quotation;
pub mod user;
