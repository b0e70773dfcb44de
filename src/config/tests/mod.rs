//! Unit tests for k2cli configuration types.
//!
//! This module contains tests organised into:
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults, accessors and serialisation
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence tests

mod helpers;
mod layer_precedence_tests;
