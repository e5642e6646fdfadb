pub mod health;
pub mod pipelines;
pub mod tools;
