// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::format;
use core::ops::Range;

use crate::{
    constants::*,
    identity::{
        CodeIdentity, CpuSvn, MachineConfiguration, SecsAttributeSet, Sha256Hash, SgxIdentity,
        SgxType, SignerAssignedIdentity,
    },
    IdentityError, Result,
};

/// A borrowed view over a raw 432-byte SGX REPORT.
///
/// Construction only checks the length. Nothing here checks the MAC.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    raw: &'a [u8],
}

impl<'a> Report<'a> {
    const R_CPUSVN: Range<usize> = 0..16;
    const R_MISCSELECT: Range<usize> = 16..20;
    const R_ISV_EXT_PROD_ID: Range<usize> = 32..48;
    const R_ATTRIBUTES: Range<usize> = 48..64;
    const R_MRENCLAVE: Range<usize> = 64..96;
    const R_MRSIGNER: Range<usize> = 128..160;
    const R_CONFIG_ID: Range<usize> = 192..256;
    const R_ISV_PROD_ID: Range<usize> = 256..258;
    const R_ISV_SVN: Range<usize> = 258..260;
    const R_CONFIG_SVN: Range<usize> = 260..262;
    const R_ISV_FAMILY_ID: Range<usize> = 304..320;
    const R_REPORT_DATA: Range<usize> = 320..384;
    const R_BODY: Range<usize> = 0..REPORT_BODY_SIZE;
    const R_KEY_ID: Range<usize> = 384..416;
    const R_MAC: Range<usize> = 416..432;

    pub fn new(raw: &'a [u8]) -> Result<Self> {
        if raw.len() != REPORT_SIZE {
            return Err(IdentityError::InvalidArgument(format!(
                "report is {} bytes, expected {}",
                raw.len(),
                REPORT_SIZE
            )));
        }
        Ok(Report { raw })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// The MACed portion of the report.
    pub fn body(&self) -> &'a [u8] {
        &self.raw[Self::R_BODY]
    }

    pub fn key_id(&self) -> [u8; KEY_ID_SIZE] {
        self.array(Self::R_KEY_ID)
    }

    pub fn mac(&self) -> [u8; MAC_SIZE] {
        self.array(Self::R_MAC)
    }

    pub fn report_data(&self) -> [u8; REPORT_DATA_SIZE] {
        self.array(Self::R_REPORT_DATA)
    }

    pub fn cpu_svn(&self) -> CpuSvn {
        CpuSvn(self.array(Self::R_CPUSVN))
    }

    pub fn miscselect(&self) -> u32 {
        u32::from_le_bytes(self.array(Self::R_MISCSELECT))
    }

    pub fn attributes(&self) -> SecsAttributeSet {
        SecsAttributeSet::from_bytes(&self.array(Self::R_ATTRIBUTES))
    }

    pub fn mrenclave(&self) -> Sha256Hash {
        Sha256Hash(self.array(Self::R_MRENCLAVE))
    }

    pub fn mrsigner(&self) -> Sha256Hash {
        Sha256Hash(self.array(Self::R_MRSIGNER))
    }

    pub fn config_id(&self) -> [u8; CONFIG_ID_SIZE] {
        self.array(Self::R_CONFIG_ID)
    }

    pub fn config_svn(&self) -> u16 {
        u16::from_le_bytes(self.array(Self::R_CONFIG_SVN))
    }

    pub fn signer_assigned_identity(&self) -> SignerAssignedIdentity {
        SignerAssignedIdentity {
            isv_prod_id: u16::from_le_bytes(self.array(Self::R_ISV_PROD_ID)),
            isv_svn: u16::from_le_bytes(self.array(Self::R_ISV_SVN)),
            isv_ext_prod_id: self.array(Self::R_ISV_EXT_PROD_ID),
            isv_family_id: self.array(Self::R_ISV_FAMILY_ID),
        }
    }

    /// Lays out a REPORT body for `identity`. A legacy identity gets a zero
    /// CPUSVN; a missing signer-assigned identity leaves its fields zero.
    pub fn encode_body(
        identity: &SgxIdentity,
        report_data: &[u8; REPORT_DATA_SIZE],
    ) -> [u8; REPORT_BODY_SIZE] {
        let code = identity.code_identity();
        let sai = code.signer_assigned_identity.unwrap_or_default();
        let cpu_svn = identity
            .machine_configuration()
            .map(|machine| machine.cpu_svn)
            .unwrap_or_default();

        let mut body = [0u8; REPORT_BODY_SIZE];
        body[Self::R_CPUSVN].copy_from_slice(&cpu_svn.0);
        body[Self::R_MISCSELECT].copy_from_slice(&code.miscselect.to_le_bytes());
        body[Self::R_ISV_EXT_PROD_ID].copy_from_slice(&sai.isv_ext_prod_id);
        body[Self::R_ATTRIBUTES].copy_from_slice(&code.attributes.to_bytes());
        body[Self::R_MRENCLAVE].copy_from_slice(code.mrenclave.as_bytes());
        body[Self::R_MRSIGNER].copy_from_slice(code.mrsigner.as_bytes());
        body[Self::R_ISV_PROD_ID].copy_from_slice(&sai.isv_prod_id.to_le_bytes());
        body[Self::R_ISV_SVN].copy_from_slice(&sai.isv_svn.to_le_bytes());
        body[Self::R_ISV_FAMILY_ID].copy_from_slice(&sai.isv_family_id);
        body[Self::R_REPORT_DATA].copy_from_slice(report_data);
        body
    }

    // The length was checked in `new`, so every fixed range is in bounds.
    fn array<const N: usize>(&self, range: Range<usize>) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.raw[range]);
        out
    }
}

/// Decodes the identity embedded in a hardware report. The report's
/// authenticity is not checked.
pub fn parse_identity_from_hardware_report(report: &Report) -> SgxIdentity {
    SgxIdentity::Current {
        code_identity: CodeIdentity {
            mrenclave: report.mrenclave(),
            mrsigner: report.mrsigner(),
            signer_assigned_identity: Some(report.signer_assigned_identity()),
            miscselect: report.miscselect(),
            attributes: report.attributes(),
        },
        machine_configuration: MachineConfiguration {
            cpu_svn: report.cpu_svn(),
            sgx_type: SgxType::Standard,
        },
    }
}

/// The TARGETINFO structure naming the enclave a report is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targetinfo {
    pub measurement: Sha256Hash,
    pub attributes: SecsAttributeSet,
    pub config_svn: u16,
    pub miscselect: u32,
    pub config_id: [u8; CONFIG_ID_SIZE],
}

impl Default for Targetinfo {
    fn default() -> Self {
        Targetinfo {
            measurement: Sha256Hash::default(),
            attributes: SecsAttributeSet::default(),
            config_svn: 0,
            miscselect: 0,
            config_id: [0; CONFIG_ID_SIZE],
        }
    }
}

impl Targetinfo {
    const R_MEASUREMENT: Range<usize> = 0..32;
    const R_ATTRIBUTES: Range<usize> = 32..48;
    const R_CONFIG_SVN: Range<usize> = 50..52;
    const R_MISCSELECT: Range<usize> = 52..56;
    const R_CONFIG_ID: Range<usize> = 64..128;

    /// Targets the enclave described by `identity`, so that it can verify
    /// reports produced for it.
    pub fn from_identity(identity: &SgxIdentity) -> Self {
        let code_identity = identity.code_identity();
        Targetinfo {
            measurement: code_identity.mrenclave,
            attributes: code_identity.attributes,
            miscselect: code_identity.miscselect,
            ..Default::default()
        }
    }

    /// Targets the enclave that produced `report`.
    pub fn from_report(report: &Report) -> Self {
        Targetinfo {
            measurement: report.mrenclave(),
            attributes: report.attributes(),
            config_svn: report.config_svn(),
            miscselect: report.miscselect(),
            config_id: report.config_id(),
        }
    }

    pub fn to_bytes(&self) -> [u8; TARGETINFO_SIZE] {
        let mut bytes = [0u8; TARGETINFO_SIZE];
        bytes[Self::R_MEASUREMENT].copy_from_slice(self.measurement.as_bytes());
        bytes[Self::R_ATTRIBUTES].copy_from_slice(&self.attributes.to_bytes());
        bytes[Self::R_CONFIG_SVN].copy_from_slice(&self.config_svn.to_le_bytes());
        bytes[Self::R_MISCSELECT].copy_from_slice(&self.miscselect.to_le_bytes());
        bytes[Self::R_CONFIG_ID].copy_from_slice(&self.config_id);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TARGETINFO_SIZE {
            return Err(IdentityError::InvalidArgument(format!(
                "targetinfo is {} bytes, expected {}",
                bytes.len(),
                TARGETINFO_SIZE
            )));
        }

        let mut measurement = [0u8; SHA256_DIGEST_SIZE];
        let mut attributes = [0u8; ATTRIBUTES_SIZE];
        let mut config_svn = [0u8; 2];
        let mut miscselect = [0u8; 4];
        let mut config_id = [0u8; CONFIG_ID_SIZE];
        measurement.copy_from_slice(&bytes[Self::R_MEASUREMENT]);
        attributes.copy_from_slice(&bytes[Self::R_ATTRIBUTES]);
        config_svn.copy_from_slice(&bytes[Self::R_CONFIG_SVN]);
        miscselect.copy_from_slice(&bytes[Self::R_MISCSELECT]);
        config_id.copy_from_slice(&bytes[Self::R_CONFIG_ID]);

        Ok(Targetinfo {
            measurement: Sha256Hash(measurement),
            attributes: SecsAttributeSet::from_bytes(&attributes),
            config_svn: u16::from_le_bytes(config_svn),
            miscselect: u32::from_le_bytes(miscselect),
            config_id,
        })
    }
}
