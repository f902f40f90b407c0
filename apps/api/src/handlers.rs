pub mod audit;
pub mod health;
pub mod retention;
pub mod statistics;
