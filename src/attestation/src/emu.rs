// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Software emulation of the SGX report instructions, for hosts without SGX
//! and for tests.
//!
//! Report keys are derived from a per-platform root secret as
//! HMAC-SHA256(root, "REPORT" || MRENCLAVE of the target || KEYID), truncated
//! to 128 bits. Two emulators sharing a root secret behave as enclaves on the
//! same platform.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use ring::hmac;
use sgx_identity::{
    constants::{KEY_ID_SIZE, REPORT_DATA_SIZE},
    CodeIdentity, CpuSvn, MachineConfiguration, Report, SecsAttributeSet, Sha256Hash, SgxIdentity,
    SgxType, SignerAssignedIdentity, Targetinfo,
};

use crate::{
    hardware::{HardwareInterface, KeyName, KeyRequest, REPORT_KEY_SIZE},
    verify::compute_report_mac,
    Error,
};

const REPORT_KEY_LABEL: &[u8] = b"REPORT";

/// An emulated enclave with a fixed identity.
pub struct EmulatedHardware {
    identity: SgxIdentity,
    root_secret: [u8; 32],
    key_id_counter: AtomicU64,
}

impl EmulatedHardware {
    /// `identity` is reported as-is; a legacy identity reports a zero CPUSVN.
    pub fn new(identity: SgxIdentity, root_secret: [u8; 32]) -> Self {
        EmulatedHardware {
            identity,
            root_secret,
            key_id_counter: AtomicU64::new(0),
        }
    }

    /// A debug-free 64-bit enclave with a signer-assigned identity, on a
    /// fixed platform.
    pub fn test_enclave() -> Self {
        let identity = SgxIdentity::Current {
            code_identity: CodeIdentity {
                mrenclave: Sha256Hash([0xa1; 32]),
                mrsigner: Sha256Hash([0xb2; 32]),
                signer_assigned_identity: Some(SignerAssignedIdentity {
                    isv_prod_id: 1,
                    isv_svn: 2,
                    isv_ext_prod_id: [0; 16],
                    isv_family_id: [0; 16],
                }),
                miscselect: 0,
                attributes: SecsAttributeSet {
                    flags: 0b0101,
                    xfrm: 0b0011,
                },
            },
            machine_configuration: MachineConfiguration {
                cpu_svn: CpuSvn([0x03; 16]),
                sgx_type: SgxType::Standard,
            },
        };
        EmulatedHardware::new(identity, [0x5e; 32])
    }

    pub fn identity(&self) -> &SgxIdentity {
        &self.identity
    }

    fn next_key_id(&self) -> [u8; KEY_ID_SIZE] {
        let counter = self.key_id_counter.fetch_add(1, Ordering::SeqCst);
        let mut key_id = [0u8; KEY_ID_SIZE];
        key_id[..8].copy_from_slice(&counter.to_le_bytes());
        key_id
    }

    fn derive_report_key(
        &self,
        measurement: &Sha256Hash,
        key_id: &[u8; KEY_ID_SIZE],
    ) -> [u8; REPORT_KEY_SIZE] {
        let key = hmac::Key::new(hmac::HMAC_SHA256, &self.root_secret);
        let mut context = hmac::Context::with_key(&key);
        context.update(REPORT_KEY_LABEL);
        context.update(measurement.as_bytes());
        context.update(key_id);

        let mut report_key = [0u8; REPORT_KEY_SIZE];
        report_key.copy_from_slice(&context.sign().as_ref()[..REPORT_KEY_SIZE]);
        report_key
    }
}

impl HardwareInterface for EmulatedHardware {
    fn report(
        &self,
        targetinfo: &Targetinfo,
        report_data: &[u8; REPORT_DATA_SIZE],
    ) -> Result<Vec<u8>, Error> {
        let body = Report::encode_body(&self.identity, report_data);
        let key_id = self.next_key_id();
        let key = self.derive_report_key(&targetinfo.measurement, &key_id);
        let mac = compute_report_mac(&key, &body)?;

        let mut report = Vec::with_capacity(body.len() + key_id.len() + mac.len());
        report.extend_from_slice(&body);
        report.extend_from_slice(&key_id);
        report.extend_from_slice(&mac);
        Ok(report)
    }

    fn report_key(&self, request: &KeyRequest) -> Result<[u8; REPORT_KEY_SIZE], Error> {
        match request.key_name {
            KeyName::Report => Ok(self.derive_report_key(
                &self.identity.code_identity().mrenclave,
                &request.key_id,
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sgx_identity::constants::REPORT_SIZE;

    #[test]
    fn test_key_ids_are_unique() {
        let hardware = EmulatedHardware::test_enclave();
        let targetinfo = Targetinfo::from_identity(hardware.identity());
        let first = hardware.report(&targetinfo, &[0; 64]).unwrap();
        let second = hardware.report(&targetinfo, &[0; 64]).unwrap();

        let first = Report::new(&first).unwrap();
        let second = Report::new(&second).unwrap();
        assert_eq!(first.body(), second.body());
        assert_ne!(first.key_id(), second.key_id());
        assert_ne!(first.mac(), second.mac());
    }

    #[test]
    fn test_report_key_depends_on_key_id_and_platform() {
        let hardware = EmulatedHardware::test_enclave();
        let same_platform = EmulatedHardware::new(*hardware.identity(), [0x5e; 32]);
        let other_platform = EmulatedHardware::new(*hardware.identity(), [0x5f; 32]);

        let request = KeyRequest::report([1; KEY_ID_SIZE]);
        let key = hardware.report_key(&request).unwrap();
        assert_eq!(key, same_platform.report_key(&request).unwrap());
        assert_ne!(key, other_platform.report_key(&request).unwrap());
        assert_ne!(
            key,
            hardware
                .report_key(&KeyRequest::report([2; KEY_ID_SIZE]))
                .unwrap()
        );
    }

    #[test]
    fn test_report_layout() {
        let hardware = EmulatedHardware::test_enclave();
        let report = hardware
            .report(&Targetinfo::default(), &[0x42; REPORT_DATA_SIZE])
            .unwrap();
        assert_eq!(report.len(), REPORT_SIZE);

        let report = Report::new(&report).unwrap();
        assert_eq!(report.mrenclave(), Sha256Hash([0xa1; 32]));
        assert_eq!(report.report_data(), [0x42; REPORT_DATA_SIZE]);
    }
}
