//! Mock collaborators for integration tests

#![allow(dead_code)]

pub mod collaborators;
