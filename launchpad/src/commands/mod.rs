// Copyright (c) 2024 Furchill

//! CLI command implementations.
//!
//! These modules implement the user-facing CLI commands and legitimately
//! use stdout for output.

pub mod init;
pub mod run;
pub mod status;
pub mod validate;
