//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and transforms
//! - Colors
//! - Keyed collections
//! - Logging utilities

pub mod collections;
pub mod color;
pub mod logging;
pub mod math;
