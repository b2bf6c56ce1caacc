mod common;

mod scoring;
mod validation;
