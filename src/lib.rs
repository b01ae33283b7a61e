pub mod catalog;
pub mod dataset;
pub mod domain;
pub mod emit;
pub mod error;
pub mod matrix;
pub mod resolver;
pub mod service;
pub mod slice;
