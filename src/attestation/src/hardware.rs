// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::vec::Vec;
use sgx_identity::{
    constants::{KEY_ID_SIZE, REPORT_DATA_SIZE},
    Targetinfo,
};

use crate::Error;

pub const REPORT_KEY_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyName {
    Report,
}

/// Parameters of a key derivation request. Only the report key is needed to
/// authenticate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRequest {
    pub key_name: KeyName,
    pub key_id: [u8; KEY_ID_SIZE],
}

impl KeyRequest {
    pub fn report(key_id: [u8; KEY_ID_SIZE]) -> Self {
        KeyRequest {
            key_name: KeyName::Report,
            key_id,
        }
    }
}

/// The enclave's view of the SGX instructions it needs.
///
/// Implementations return raw hardware output. Callers must not trust a
/// returned report until it has been checked with
/// [`verify_hardware_report`](crate::verify_hardware_report).
pub trait HardwareInterface {
    /// EREPORT: a report about the calling enclave, MACed for `targetinfo`.
    fn report(
        &self,
        targetinfo: &Targetinfo,
        report_data: &[u8; REPORT_DATA_SIZE],
    ) -> Result<Vec<u8>, Error>;

    /// EGETKEY for the calling enclave.
    fn report_key(&self, request: &KeyRequest) -> Result<[u8; REPORT_KEY_SIZE], Error>;
}
