mod common;

mod components_tests;
mod containers_tests;
