// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! SGX enclave identity model, match specifications and the matching engine
//! that decides whether an identity satisfies an expectation.
//!
//! Identities and match specifications exist in two forms:
//! - the typed form ([`SgxIdentity`], [`SgxIdentityMatchSpec`]) in which a
//!   legacy value is a distinct variant;
//! - the message form ([`message`]) carried inside the generic envelopes,
//!   on which the structural validity predicates run.

#![no_std]
extern crate alloc;

pub mod constants;
pub mod envelope;
pub mod identity;
pub mod mask;
pub mod match_spec;
pub mod matching;
pub mod message;
pub mod report;

pub use envelope::*;
pub use identity::*;
pub use mask::MaskedBits;
pub use match_spec::*;
pub use matching::*;
pub use report::*;

use alloc::string::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Structurally malformed identity, match spec or expectation, or a
    /// legacy-ness disagreement between paired values.
    InvalidArgument(String),
    /// The envelope does not carry an SGX code identity.
    WrongIdentityType(String),
    /// The envelope payload cannot be decoded into a valid value.
    MalformedPayload(String),
}

pub type Result<T> = core::result::Result<T, IdentityError>;
