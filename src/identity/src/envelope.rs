// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::{format, string::String, vec::Vec};
use core::convert::TryFrom;
use serde::{Deserialize, Serialize};

use crate::{
    constants::SGX_AUTHORITY_TYPE,
    identity::SgxIdentity,
    match_spec::SgxIdentityMatchSpec,
    matching::{set_expectation, SgxIdentityExpectation},
    message::{SgxIdentityMatchSpecMessage, SgxIdentityMessage},
    IdentityError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityType {
    UnknownIdentity,
    NullIdentity,
    CodeIdentity,
    CertIdentity,
}

impl IdentityType {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityType::UnknownIdentity => "UNKNOWN_IDENTITY",
            IdentityType::NullIdentity => "NULL_IDENTITY",
            IdentityType::CodeIdentity => "CODE_IDENTITY",
            IdentityType::CertIdentity => "CERT_IDENTITY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveIdentityDescription {
    pub identity_type: IdentityType,
    pub authority_type: String,
}

impl EnclaveIdentityDescription {
    pub fn sgx() -> Self {
        EnclaveIdentityDescription {
            identity_type: IdentityType::CodeIdentity,
            authority_type: String::from(SGX_AUTHORITY_TYPE),
        }
    }

    fn is_sgx(&self) -> bool {
        self.identity_type == IdentityType::CodeIdentity
            && self.authority_type == SGX_AUTHORITY_TYPE
    }
}

/// An identity of any authority, with an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveIdentity {
    pub description: EnclaveIdentityDescription,
    #[serde(with = "hex")]
    pub identity: Vec<u8>,
}

/// A reference identity and an opaque match spec payload for the same
/// authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveIdentityExpectation {
    pub reference_identity: EnclaveIdentity,
    #[serde(with = "hex")]
    pub match_spec: Vec<u8>,
    pub is_legacy: bool,
    /// Free-text description of the expectation. Not interpreted on parse.
    pub description: String,
}

pub fn serialize_sgx_identity(identity: &SgxIdentity) -> Result<EnclaveIdentity> {
    let payload = serde_json::to_vec(&SgxIdentityMessage::from(identity))
        .map_err(|e| IdentityError::InvalidArgument(format!("{}", e)))?;

    Ok(EnclaveIdentity {
        description: EnclaveIdentityDescription::sgx(),
        identity: payload,
    })
}

pub fn parse_sgx_identity(identity: &EnclaveIdentity) -> Result<SgxIdentity> {
    check_description(&identity.description)?;

    let message = serde_json::from_slice::<SgxIdentityMessage>(&identity.identity)
        .map_err(|e| IdentityError::MalformedPayload(format!("SGX identity: {}", e)))?;
    SgxIdentity::try_from(&message).map_err(into_malformed)
}

pub fn serialize_sgx_match_spec(match_spec: &SgxIdentityMatchSpec) -> Result<Vec<u8>> {
    serde_json::to_vec(&SgxIdentityMatchSpecMessage::from(match_spec))
        .map_err(|e| IdentityError::InvalidArgument(format!("{}", e)))
}

pub fn parse_sgx_match_spec(payload: &[u8], is_legacy: bool) -> Result<SgxIdentityMatchSpec> {
    let message = serde_json::from_slice::<SgxIdentityMatchSpecMessage>(payload)
        .map_err(|e| IdentityError::MalformedPayload(format!("SGX match spec: {}", e)))?;

    if let Some(embedded) = message.is_legacy {
        if embedded != is_legacy {
            return Err(IdentityError::InvalidArgument(format!(
                "match spec is_legacy = {} but is_legacy = {} was requested",
                embedded, is_legacy
            )));
        }
    }

    SgxIdentityMatchSpec::try_from(&message).map_err(into_malformed)
}

pub fn serialize_sgx_expectation(
    expectation: &SgxIdentityExpectation,
) -> Result<EnclaveIdentityExpectation> {
    Ok(EnclaveIdentityExpectation {
        reference_identity: serialize_sgx_identity(expectation.reference_identity())?,
        match_spec: serialize_sgx_match_spec(expectation.match_spec())?,
        is_legacy: expectation.is_legacy(),
        description: expectation_description(expectation.is_legacy()),
    })
}

fn expectation_description(is_legacy: bool) -> String {
    format!(
        "{} {} expectation{}",
        SGX_AUTHORITY_TYPE,
        IdentityType::CodeIdentity.as_str(),
        if is_legacy { " (legacy)" } else { "" }
    )
}

pub fn parse_sgx_expectation(
    expectation: &EnclaveIdentityExpectation,
    is_legacy: bool,
) -> Result<SgxIdentityExpectation> {
    if expectation.is_legacy != is_legacy {
        return Err(IdentityError::InvalidArgument(format!(
            "expectation is_legacy = {} but is_legacy = {} was requested",
            expectation.is_legacy, is_legacy
        )));
    }

    let reference_identity = parse_sgx_identity(&expectation.reference_identity)?;
    let match_spec = parse_sgx_match_spec(&expectation.match_spec, is_legacy)?;
    set_expectation(&match_spec, &reference_identity)
}

fn check_description(description: &EnclaveIdentityDescription) -> Result<()> {
    if description.is_sgx() {
        Ok(())
    } else {
        Err(IdentityError::WrongIdentityType(format!(
            "expected {} from authority {}, found {} from authority {}",
            IdentityType::CodeIdentity.as_str(),
            SGX_AUTHORITY_TYPE,
            description.identity_type.as_str(),
            description.authority_type
        )))
    }
}

fn into_malformed(e: IdentityError) -> IdentityError {
    match e {
        IdentityError::InvalidArgument(msg) => IdentityError::MalformedPayload(msg),
        other => other,
    }
}
