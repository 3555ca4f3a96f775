#![cfg(test)]

mod fixture;
mod loader_tests;
