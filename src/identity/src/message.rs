// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Message form of identities and match specs, as carried in envelope
//! payloads. Every field is optional so that "not set" survives decoding and
//! can be rejected by the validity predicates. Byte strings are hex encoded.

use alloc::{format, string::String};
use serde::{Deserialize, Serialize};

use crate::{IdentityError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerAssignedIdentityMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isv_prod_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isv_svn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isv_ext_prod_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isv_family_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeIdentityMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrenclave: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrsigner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_assigned_identity: Option<SignerAssignedIdentityMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miscselect: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfigurationMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_svn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sgx_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgxIdentityMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_identity: Option<CodeIdentityMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_configuration: Option<MachineConfigurationMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeIdentityMatchSpecMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mrenclave_match_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mrsigner_match_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_signer_assigned_identity_match_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miscselect_match_mask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_match_mask: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfigurationMatchSpecMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cpu_svn_match_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sgx_type_match_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgxIdentityMatchSpecMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_legacy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_identity_match_spec: Option<CodeIdentityMatchSpecMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_configuration_match_spec: Option<MachineConfigurationMatchSpecMessage>,
}

pub(crate) fn required<T: Copy>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| IdentityError::InvalidArgument(format!("{} is not set", name)))
}

pub(crate) fn required_u16(field: Option<u32>, name: &str) -> Result<u16> {
    let value = required(field, name)?;
    u16::try_from(value).map_err(|_| {
        IdentityError::InvalidArgument(format!("{} value {} is out of range", name, value))
    })
}

pub(crate) fn required_bytes<const N: usize>(
    field: &Option<String>,
    name: &str,
) -> Result<[u8; N]> {
    let encoded = field
        .as_deref()
        .ok_or_else(|| IdentityError::InvalidArgument(format!("{} is not set", name)))?;

    let mut bytes = [0u8; N];
    hex::decode_to_slice(encoded, &mut bytes).map_err(|_| {
        IdentityError::InvalidArgument(format!("{} is not a {}-byte hex string", name, N))
    })?;
    Ok(bytes)
}
