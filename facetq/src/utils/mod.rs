//! Utility functions shared by the compiler, facet engine and CLI

pub mod file;
pub mod sql;
pub mod string;
