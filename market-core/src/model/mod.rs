pub mod order;
pub mod price;
pub mod strategy;
