// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use aes::Aes128;
use alloc::string::String;
use cmac::{Cmac, Mac};
use sgx_identity::{constants::MAC_SIZE, Report};

use crate::{
    hardware::{HardwareInterface, KeyRequest, REPORT_KEY_SIZE},
    Error,
};

/// Checks that `raw_report` was produced by this platform for the calling
/// enclave.
///
/// The report key named by the report's KEYID is derived through `hardware`
/// and the AES-128-CMAC of the report body is compared with the embedded MAC
/// in constant time.
pub fn verify_hardware_report(
    hardware: &dyn HardwareInterface,
    raw_report: &[u8],
) -> Result<(), Error> {
    let report = Report::new(raw_report)?;

    #[cfg(feature = "log")]
    log::debug!("Requesting report key for KEYID {:02x?}\n", report.key_id());
    let key = hardware.report_key(&KeyRequest::report(report.key_id()))?;

    let mut mac = new_report_mac(&key)?;
    mac.update(report.body());
    mac.verify_slice(&report.mac()).map_err(|_| {
        #[cfg(feature = "log")]
        log::error!("REPORT MAC verification failed\n");
        Error::Authenticity
    })
}

/// AES-128-CMAC of a report body under `key`.
pub fn compute_report_mac(
    key: &[u8; REPORT_KEY_SIZE],
    body: &[u8],
) -> Result<[u8; MAC_SIZE], Error> {
    let mut mac = new_report_mac(key)?;
    mac.update(body);

    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn new_report_mac(key: &[u8; REPORT_KEY_SIZE]) -> Result<Cmac<Aes128>, Error> {
    <Cmac<Aes128> as Mac>::new_from_slice(key)
        .map_err(|_| Error::Hardware(String::from("invalid report key length")))
}
