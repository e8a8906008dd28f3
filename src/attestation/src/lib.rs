// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! SGX REPORT authentication and self-identity discovery on top of
//! `sgx_identity`, behind a [`HardwareInterface`] boundary.

#![no_std]

extern crate alloc;

pub mod emu;
mod hardware;
mod self_identity;
mod verify;

pub use hardware::*;
pub use self_identity::*;
pub use verify::*;

use alloc::string::String;
use sgx_identity::IdentityError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The REPORT MAC does not verify under the platform's report key.
    Authenticity,
    /// The hardware boundary failed to produce a report or a key.
    Hardware(String),
    /// A report returned by the hardware is not the one that was requested.
    InvalidReport,
    Identity(IdentityError),
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Error::Identity(e)
    }
}
