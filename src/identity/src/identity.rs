// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::{
    format,
    string::{String, ToString},
};
use core::{
    convert::TryFrom,
    fmt,
    ops::{BitAnd, BitOr, Not},
};

use crate::{
    constants::*,
    message::{
        required, required_bytes, required_u16, CodeIdentityMessage, MachineConfigurationMessage,
        SgxIdentityMessage, SignerAssignedIdentityMessage,
    },
    IdentityError, Result,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; SHA256_DIGEST_SIZE]);

impl Sha256Hash {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Security version of the CPU microcode and firmware. The components are
/// ordered individually, so two CPUSVNs are not always comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CpuSvn(pub [u8; CPUSVN_SIZE]);

impl CpuSvn {
    /// Whether every component is at least the corresponding component of
    /// `reference`.
    pub fn is_at_least(&self, reference: &CpuSvn) -> bool {
        self.0.iter().zip(reference.0.iter()).all(|(own, min)| own >= min)
    }
}

impl fmt::Display for CpuSvn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SgxType {
    Standard,
}

impl SgxType {
    pub fn as_str(&self) -> &str {
        match self {
            SgxType::Standard => "STANDARD",
        }
    }
}

impl TryFrom<&str> for SgxType {
    type Error = IdentityError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "STANDARD" => Ok(SgxType::Standard),
            _ => Err(IdentityError::InvalidArgument(format!(
                "unknown SGX type {}",
                value
            ))),
        }
    }
}

/// The 128-bit SECS ATTRIBUTES field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SecsAttributeSet {
    pub flags: u64,
    pub xfrm: u64,
}

impl SecsAttributeSet {
    pub const fn all() -> Self {
        Self {
            flags: u64::MAX,
            xfrm: u64::MAX,
        }
    }

    pub fn from_bits(bits: &[SecsAttributeBit]) -> Self {
        bits.iter().fold(Self::default(), |mut set, bit| {
            set.set(*bit);
            set
        })
    }

    pub fn set(&mut self, bit: SecsAttributeBit) {
        let position = bit as u8;
        if position < 64 {
            self.flags |= 1 << position;
        } else {
            self.xfrm |= 1 << (position - 64);
        }
    }

    pub fn is_set(&self, bit: SecsAttributeBit) -> bool {
        let position = bit as u8;
        if position < 64 {
            self.flags & (1 << position) != 0
        } else {
            self.xfrm & (1 << (position - 64)) != 0
        }
    }

    /// Little-endian `flags` followed by little-endian `xfrm`, as laid out in
    /// a REPORT.
    pub fn to_bytes(&self) -> [u8; ATTRIBUTES_SIZE] {
        let mut bytes = [0u8; ATTRIBUTES_SIZE];
        bytes[..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..].copy_from_slice(&self.xfrm.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; ATTRIBUTES_SIZE]) -> Self {
        let mut flags = [0u8; 8];
        let mut xfrm = [0u8; 8];
        flags.copy_from_slice(&bytes[..8]);
        xfrm.copy_from_slice(&bytes[8..]);
        Self {
            flags: u64::from_le_bytes(flags),
            xfrm: u64::from_le_bytes(xfrm),
        }
    }
}

impl BitAnd for SecsAttributeSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            flags: self.flags & rhs.flags,
            xfrm: self.xfrm & rhs.xfrm,
        }
    }
}

impl BitOr for SecsAttributeSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            flags: self.flags | rhs.flags,
            xfrm: self.xfrm | rhs.xfrm,
        }
    }
}

impl Not for SecsAttributeSet {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            flags: !self.flags,
            xfrm: !self.xfrm,
        }
    }
}

impl fmt::Display for SecsAttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{flags: {:#018x}, xfrm: {:#018x}}}", self.flags, self.xfrm)
    }
}

/// Identity values the enclave signer chooses at signing time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignerAssignedIdentity {
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub isv_ext_prod_id: [u8; ISV_EXT_PROD_ID_SIZE],
    pub isv_family_id: [u8; ISV_FAMILY_ID_SIZE],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodeIdentity {
    pub mrenclave: Sha256Hash,
    pub mrsigner: Sha256Hash,
    pub signer_assigned_identity: Option<SignerAssignedIdentity>,
    pub miscselect: u32,
    pub attributes: SecsAttributeSet,
}

/// Patch and configuration level of the platform the enclave runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineConfiguration {
    pub cpu_svn: CpuSvn,
    pub sgx_type: SgxType,
}

/// The measured identity of an SGX enclave.
///
/// A `Legacy` identity predates machine configurations and carries only the
/// code identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SgxIdentity {
    Legacy(CodeIdentity),
    Current {
        code_identity: CodeIdentity,
        machine_configuration: MachineConfiguration,
    },
}

impl SgxIdentity {
    pub fn code_identity(&self) -> &CodeIdentity {
        match self {
            SgxIdentity::Legacy(code_identity) => code_identity,
            SgxIdentity::Current { code_identity, .. } => code_identity,
        }
    }

    pub fn machine_configuration(&self) -> Option<&MachineConfiguration> {
        match self {
            SgxIdentity::Legacy(_) => None,
            SgxIdentity::Current {
                machine_configuration,
                ..
            } => Some(machine_configuration),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, SgxIdentity::Legacy(_))
    }

    /// The legacy view of this identity, without machine configuration.
    pub fn to_legacy(&self) -> SgxIdentity {
        SgxIdentity::Legacy(*self.code_identity())
    }
}

/// Checks that every field of a signer-assigned identity is set and in range.
pub fn is_valid_signer_assigned_identity(identity: &SignerAssignedIdentityMessage) -> bool {
    SignerAssignedIdentity::try_from(identity).is_ok()
}

/// Checks that an identity message is structurally valid. Both legacy and
/// non-legacy shapes are accepted; a machine configuration that is present
/// must be complete.
pub fn is_valid_sgx_identity(identity: &SgxIdentityMessage) -> bool {
    SgxIdentity::try_from(identity).is_ok()
}

impl TryFrom<&SignerAssignedIdentityMessage> for SignerAssignedIdentity {
    type Error = IdentityError;

    fn try_from(message: &SignerAssignedIdentityMessage) -> Result<Self> {
        Ok(SignerAssignedIdentity {
            isv_prod_id: required_u16(message.isv_prod_id, "isv_prod_id")?,
            isv_svn: required_u16(message.isv_svn, "isv_svn")?,
            isv_ext_prod_id: required_bytes(&message.isv_ext_prod_id, "isv_ext_prod_id")?,
            isv_family_id: required_bytes(&message.isv_family_id, "isv_family_id")?,
        })
    }
}

impl From<&SignerAssignedIdentity> for SignerAssignedIdentityMessage {
    fn from(identity: &SignerAssignedIdentity) -> Self {
        SignerAssignedIdentityMessage {
            isv_prod_id: Some(identity.isv_prod_id.into()),
            isv_svn: Some(identity.isv_svn.into()),
            isv_ext_prod_id: Some(hex::encode(identity.isv_ext_prod_id)),
            isv_family_id: Some(hex::encode(identity.isv_family_id)),
        }
    }
}

impl TryFrom<&CodeIdentityMessage> for CodeIdentity {
    type Error = IdentityError;

    fn try_from(message: &CodeIdentityMessage) -> Result<Self> {
        let signer_assigned_identity = message
            .signer_assigned_identity
            .as_ref()
            .map(SignerAssignedIdentity::try_from)
            .transpose()?;

        Ok(CodeIdentity {
            mrenclave: Sha256Hash(required_bytes(&message.mrenclave, "mrenclave")?),
            mrsigner: Sha256Hash(required_bytes(&message.mrsigner, "mrsigner")?),
            signer_assigned_identity,
            miscselect: required(message.miscselect, "miscselect")?,
            attributes: SecsAttributeSet::from_bytes(&required_bytes(
                &message.attributes,
                "attributes",
            )?),
        })
    }
}

impl From<&CodeIdentity> for CodeIdentityMessage {
    fn from(identity: &CodeIdentity) -> Self {
        CodeIdentityMessage {
            mrenclave: Some(hex::encode(identity.mrenclave.0)),
            mrsigner: Some(hex::encode(identity.mrsigner.0)),
            signer_assigned_identity: identity
                .signer_assigned_identity
                .as_ref()
                .map(SignerAssignedIdentityMessage::from),
            miscselect: Some(identity.miscselect),
            attributes: Some(hex::encode(identity.attributes.to_bytes())),
        }
    }
}

impl TryFrom<&MachineConfigurationMessage> for MachineConfiguration {
    type Error = IdentityError;

    fn try_from(message: &MachineConfigurationMessage) -> Result<Self> {
        let sgx_type = message
            .sgx_type
            .as_deref()
            .ok_or_else(|| IdentityError::InvalidArgument("sgx_type is not set".to_string()))?;

        Ok(MachineConfiguration {
            cpu_svn: CpuSvn(required_bytes(&message.cpu_svn, "cpu_svn")?),
            sgx_type: SgxType::try_from(sgx_type)?,
        })
    }
}

impl From<&MachineConfiguration> for MachineConfigurationMessage {
    fn from(configuration: &MachineConfiguration) -> Self {
        MachineConfigurationMessage {
            cpu_svn: Some(hex::encode(configuration.cpu_svn.0)),
            sgx_type: Some(String::from(configuration.sgx_type.as_str())),
        }
    }
}

impl TryFrom<&SgxIdentityMessage> for SgxIdentity {
    type Error = IdentityError;

    fn try_from(message: &SgxIdentityMessage) -> Result<Self> {
        let code_identity = message.code_identity.as_ref().ok_or_else(|| {
            IdentityError::InvalidArgument("code_identity is not set".to_string())
        })?;
        let code_identity = CodeIdentity::try_from(code_identity)?;

        match message.machine_configuration.as_ref() {
            None => Ok(SgxIdentity::Legacy(code_identity)),
            Some(configuration) => Ok(SgxIdentity::Current {
                code_identity,
                machine_configuration: MachineConfiguration::try_from(configuration)?,
            }),
        }
    }
}

impl From<&SgxIdentity> for SgxIdentityMessage {
    fn from(identity: &SgxIdentity) -> Self {
        SgxIdentityMessage {
            code_identity: Some(CodeIdentityMessage::from(identity.code_identity())),
            machine_configuration: identity
                .machine_configuration()
                .map(MachineConfigurationMessage::from),
        }
    }
}
