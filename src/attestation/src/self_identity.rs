// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use ring::digest;
use sgx_identity::{
    constants::REPORT_DATA_SIZE, default_match_spec, parse_identity_from_hardware_report,
    set_expectation, strict_match_spec, Report, SgxIdentity, SgxIdentityExpectation, Targetinfo,
};

use crate::{hardware::HardwareInterface, verify::verify_hardware_report, Error};

const SELF_REPORT_LABEL: &[u8] = b"SGX self identity report";

/// Source of the calling enclave's own identity.
pub trait SelfIdentityProvider {
    fn self_identity(&self) -> Result<SgxIdentity, Error>;
}

/// Learns the enclave's identity from an authenticated self-targeted report.
pub struct HardwareSelfIdentity<H: HardwareInterface> {
    hardware: H,
}

impl<H: HardwareInterface> HardwareSelfIdentity<H> {
    pub fn new(hardware: H) -> Self {
        HardwareSelfIdentity { hardware }
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }
}

impl<H: HardwareInterface> SelfIdentityProvider for HardwareSelfIdentity<H> {
    fn self_identity(&self) -> Result<SgxIdentity, Error> {
        // A report for an all-zero target cannot be verified here, but it
        // tells us our own measurement.
        let probe = self
            .hardware
            .report(&Targetinfo::default(), &[0; REPORT_DATA_SIZE])?;
        let probe = Report::new(&probe)?;
        let targetinfo = Targetinfo::from_report(&probe);

        let report_data = self_report_data();
        let raw = self.hardware.report(&targetinfo, &report_data)?;
        verify_hardware_report(&self.hardware, &raw)?;

        let report = Report::new(&raw)?;
        if report.report_data() != report_data || report.mrenclave() != probe.mrenclave() {
            #[cfg(feature = "log")]
            log::error!("Self-targeted report does not echo the request\n");
            return Err(Error::InvalidReport);
        }

        #[cfg(feature = "log")]
        log::debug!("Self identity MRENCLAVE {}\n", report.mrenclave());
        Ok(parse_identity_from_hardware_report(&report))
    }
}

fn self_report_data() -> [u8; REPORT_DATA_SIZE] {
    let mut report_data = [0u8; REPORT_DATA_SIZE];
    let hash = digest::digest(&digest::SHA256, SELF_REPORT_LABEL);
    report_data[..hash.as_ref().len()].copy_from_slice(hash.as_ref());
    report_data
}

/// A provider that always answers with a stored identity.
pub struct FixedSelfIdentity {
    identity: SgxIdentity,
}

impl FixedSelfIdentity {
    pub fn new(identity: SgxIdentity) -> Self {
        FixedSelfIdentity { identity }
    }
}

impl SelfIdentityProvider for FixedSelfIdentity {
    fn self_identity(&self) -> Result<SgxIdentity, Error> {
        Ok(self.identity)
    }
}

/// The default match spec bound to this enclave's identity.
pub fn default_self_sgx_identity_expectation(
    provider: &dyn SelfIdentityProvider,
) -> Result<SgxIdentityExpectation, Error> {
    let identity = provider.self_identity()?;
    Ok(set_expectation(
        &default_match_spec(identity.is_legacy()),
        &identity,
    )?)
}

/// The strict match spec bound to this enclave's identity.
pub fn strict_self_sgx_identity_expectation(
    provider: &dyn SelfIdentityProvider,
) -> Result<SgxIdentityExpectation, Error> {
    let identity = provider.self_identity()?;
    Ok(set_expectation(
        &strict_match_spec(identity.is_legacy()),
        &identity,
    )?)
}

/// A TARGETINFO under which this enclave can verify reports addressed to it.
pub fn self_targetinfo(provider: &dyn SelfIdentityProvider) -> Result<Targetinfo, Error> {
    Ok(Targetinfo::from_identity(&provider.self_identity()?))
}
