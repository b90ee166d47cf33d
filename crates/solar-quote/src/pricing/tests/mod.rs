mod common;

mod catalog;
mod quote;
