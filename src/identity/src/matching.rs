// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::{format, string::String};

use crate::{
    identity::{CodeIdentity, MachineConfiguration, SgxIdentity, SignerAssignedIdentity},
    mask::MaskedBits,
    match_spec::{CodeIdentityMatchSpec, MachineConfigurationMatchSpec, SgxIdentityMatchSpec},
    IdentityError, Result,
};

/// A reference identity paired with the match spec it is judged by. Both
/// halves always agree on legacy-ness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SgxIdentityExpectation {
    reference_identity: SgxIdentity,
    match_spec: SgxIdentityMatchSpec,
}

impl SgxIdentityExpectation {
    pub fn reference_identity(&self) -> &SgxIdentity {
        &self.reference_identity
    }

    pub fn match_spec(&self) -> &SgxIdentityMatchSpec {
        &self.match_spec
    }

    pub fn is_legacy(&self) -> bool {
        self.match_spec.is_legacy()
    }
}

/// Pairs `match_spec` with `identity`. Fails if one is legacy and the other
/// is not, or if `identity` lacks a field `match_spec` requires.
pub fn set_expectation(
    match_spec: &SgxIdentityMatchSpec,
    identity: &SgxIdentity,
) -> Result<SgxIdentityExpectation> {
    if match_spec.is_legacy() != identity.is_legacy() {
        return Err(IdentityError::InvalidArgument(format!(
            "match spec is_legacy = {} but reference identity is_legacy = {}",
            match_spec.is_legacy(),
            identity.is_legacy()
        )));
    }
    if !is_identity_compatible_with_match_spec(identity, match_spec) {
        return Err(IdentityError::InvalidArgument(String::from(
            "reference identity lacks a field its match spec requires",
        )));
    }

    Ok(SgxIdentityExpectation {
        reference_identity: *identity,
        match_spec: *match_spec,
    })
}

/// Whether `identity` carries every field `match_spec` requires, so that it
/// can serve as the reference of an expectation.
pub fn is_identity_compatible_with_match_spec(
    identity: &SgxIdentity,
    match_spec: &SgxIdentityMatchSpec,
) -> bool {
    if identity.is_legacy() != match_spec.is_legacy() {
        return false;
    }

    !match_spec
        .code_identity()
        .is_signer_assigned_identity_match_required
        || identity.code_identity().signer_assigned_identity.is_some()
}

pub fn is_valid_expectation(expectation: &SgxIdentityExpectation, is_legacy: bool) -> bool {
    expectation.match_spec.is_legacy() == is_legacy
        && is_identity_compatible_with_match_spec(
            &expectation.reference_identity,
            &expectation.match_spec,
        )
}

/// Result of comparing an identity against an expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Match,
    /// Names the first field that did not match.
    Mismatch(String),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match)
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            MatchOutcome::Match => None,
            MatchOutcome::Mismatch(explanation) => Some(explanation.as_str()),
        }
    }
}

/// Decides whether `identity` satisfies `expectation`.
///
/// Fields are checked in a fixed order and the first failing field is
/// reported. When `is_legacy` is set only the code identity is compared,
/// even if `identity` carries a machine configuration.
pub fn match_identity_to_expectation(
    identity: &SgxIdentity,
    expectation: &SgxIdentityExpectation,
    is_legacy: bool,
) -> Result<MatchOutcome> {
    if !is_valid_expectation(expectation, is_legacy) {
        return Err(IdentityError::InvalidArgument(format!(
            "expectation (is_legacy = {}) is not valid for is_legacy = {}",
            expectation.is_legacy(),
            is_legacy
        )));
    }
    if !is_legacy && identity.is_legacy() {
        return Err(IdentityError::InvalidArgument(String::from(
            "a legacy identity cannot be matched against a non-legacy expectation",
        )));
    }

    let mut mismatch = match_code_identity(
        identity.code_identity(),
        expectation.reference_identity.code_identity(),
        expectation.match_spec.code_identity(),
    );

    if mismatch.is_none() && !is_legacy {
        mismatch = match (
            identity.machine_configuration(),
            expectation.reference_identity.machine_configuration(),
            expectation.match_spec.machine_configuration(),
        ) {
            (Some(actual), Some(reference), Some(spec)) => {
                match_machine_configuration(actual, reference, spec)
            }
            _ => {
                return Err(IdentityError::InvalidArgument(String::from(
                    "machine configuration is missing",
                )))
            }
        };
    }

    Ok(match mismatch {
        None => MatchOutcome::Match,
        Some(explanation) => {
            log_mismatch(&explanation);
            MatchOutcome::Mismatch(explanation)
        }
    })
}

fn match_code_identity(
    actual: &CodeIdentity,
    reference: &CodeIdentity,
    spec: &CodeIdentityMatchSpec,
) -> Option<String> {
    if spec.is_mrenclave_match_required && actual.mrenclave != reference.mrenclave {
        return Some(format!(
            "MRENCLAVE value {} does not match expected MRENCLAVE value {}",
            actual.mrenclave, reference.mrenclave
        ));
    }

    if spec.is_mrsigner_match_required && actual.mrsigner != reference.mrsigner {
        return Some(format!(
            "MRSIGNER value {} does not match expected MRSIGNER value {}",
            actual.mrsigner, reference.mrsigner
        ));
    }

    if spec.is_signer_assigned_identity_match_required {
        match (
            actual.signer_assigned_identity.as_ref(),
            reference.signer_assigned_identity.as_ref(),
        ) {
            (Some(actual), Some(reference)) => {
                if let Some(explanation) = match_signer_assigned_identity(actual, reference) {
                    return Some(explanation);
                }
            }
            (_, None) => {
                return Some(String::from(
                    "signer-assigned identity is required but the reference identity has none",
                ))
            }
            (None, Some(_)) => {
                return Some(String::from(
                    "signer-assigned identity is required but the identity has none",
                ))
            }
        }
    }

    if !MaskedBits::new(reference.miscselect, spec.miscselect_match_mask)
        .matches(actual.miscselect)
    {
        return Some(format!(
            "MISCSELECT value {:#010x} does not match expected MISCSELECT value {:#010x} under mask {:#010x}",
            actual.miscselect, reference.miscselect, spec.miscselect_match_mask
        ));
    }

    if !MaskedBits::new(reference.attributes, spec.attributes_match_mask)
        .matches(actual.attributes)
    {
        return Some(format!(
            "ATTRIBUTES value {} does not match expected ATTRIBUTES value {} under mask {}",
            actual.attributes, reference.attributes, spec.attributes_match_mask
        ));
    }

    None
}

fn match_signer_assigned_identity(
    actual: &SignerAssignedIdentity,
    reference: &SignerAssignedIdentity,
) -> Option<String> {
    if actual.isv_prod_id != reference.isv_prod_id {
        return Some(format!(
            "ISVPRODID value {} does not match expected ISVPRODID value {}",
            actual.isv_prod_id, reference.isv_prod_id
        ));
    }
    if actual.isv_ext_prod_id != reference.isv_ext_prod_id {
        return Some(format!(
            "ISVEXTPRODID value {} does not match expected ISVEXTPRODID value {}",
            hex::encode(actual.isv_ext_prod_id),
            hex::encode(reference.isv_ext_prod_id)
        ));
    }
    if actual.isv_family_id != reference.isv_family_id {
        return Some(format!(
            "ISVFAMILYID value {} does not match expected ISVFAMILYID value {}",
            hex::encode(actual.isv_family_id),
            hex::encode(reference.isv_family_id)
        ));
    }
    if actual.isv_svn < reference.isv_svn {
        return Some(format!(
            "ISVSVN value {} is lower than expected ISVSVN value {}",
            actual.isv_svn, reference.isv_svn
        ));
    }
    None
}

fn match_machine_configuration(
    actual: &MachineConfiguration,
    reference: &MachineConfiguration,
    spec: &MachineConfigurationMatchSpec,
) -> Option<String> {
    if spec.is_cpu_svn_match_required && !actual.cpu_svn.is_at_least(&reference.cpu_svn) {
        return Some(format!(
            "CPUSVN value {} is not at least expected CPUSVN value {}",
            actual.cpu_svn, reference.cpu_svn
        ));
    }

    if spec.is_sgx_type_match_required && actual.sgx_type != reference.sgx_type {
        return Some(format!(
            "SGX type {} does not match expected SGX type {}",
            actual.sgx_type.as_str(),
            reference.sgx_type.as_str()
        ));
    }

    None
}

fn log_mismatch(_explanation: &str) {
    #[cfg(feature = "log")]
    {
        use log::debug;

        debug!("Identity mismatch: {}\n", _explanation);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        constants::SecsAttributeBit,
        identity::{test::*, CpuSvn, SecsAttributeSet, Sha256Hash},
        match_spec::{default_match_spec, strict_match_spec},
    };

    fn legacy_spec(attributes_match_mask: u64) -> SgxIdentityMatchSpec {
        SgxIdentityMatchSpec::Legacy(CodeIdentityMatchSpec {
            is_mrenclave_match_required: false,
            is_mrsigner_match_required: true,
            is_signer_assigned_identity_match_required: false,
            miscselect_match_mask: u32::MAX,
            attributes_match_mask: SecsAttributeSet {
                flags: attributes_match_mask,
                xfrm: 0,
            },
        })
    }

    fn with_attributes(identity: SgxIdentity, flags: u64) -> SgxIdentity {
        let mut code = *identity.code_identity();
        code.attributes = SecsAttributeSet { flags, xfrm: 0 };
        SgxIdentity::Legacy(code)
    }

    #[test]
    fn test_masked_attribute_difference_matches() {
        let candidate = with_attributes(legacy_identity(), 0b1010);
        let reference = with_attributes(legacy_identity(), 0b0010);
        let expectation = set_expectation(&legacy_spec(0b0110), &reference).unwrap();

        let outcome = match_identity_to_expectation(&candidate, &expectation, true).unwrap();
        assert_eq!(outcome, MatchOutcome::Match);
        assert!(outcome.explanation().is_none());

        let expectation = set_expectation(&legacy_spec(0b1110), &reference).unwrap();
        let outcome = match_identity_to_expectation(&candidate, &expectation, true).unwrap();
        assert!(outcome.explanation().unwrap().contains("ATTRIBUTES"));
    }

    #[test]
    fn test_signer_mismatch_is_explained() {
        let candidate = with_attributes(legacy_identity(), 0b1010);
        let mut reference = *with_attributes(legacy_identity(), 0b0010).code_identity();
        reference.mrsigner = Sha256Hash([0x33; 32]);
        let expectation =
            set_expectation(&legacy_spec(0b0110), &SgxIdentity::Legacy(reference)).unwrap();

        let outcome = match_identity_to_expectation(&candidate, &expectation, true).unwrap();
        assert!(!outcome.is_match());
        assert!(outcome.explanation().unwrap().contains("MRSIGNER"));
    }

    #[test]
    fn test_set_expectation_legacy_consistency() {
        assert!(matches!(
            set_expectation(&strict_match_spec(false), &legacy_identity()),
            Err(IdentityError::InvalidArgument(_))
        ));
        assert!(matches!(
            set_expectation(&default_match_spec(true), &current_identity()),
            Err(IdentityError::InvalidArgument(_))
        ));

        let expectation = set_expectation(&strict_match_spec(false), &current_identity()).unwrap();
        assert!(is_valid_expectation(&expectation, false));
        assert!(!is_valid_expectation(&expectation, true));
        assert_eq!(expectation.reference_identity(), &current_identity());
    }

    #[test]
    fn test_reference_without_required_signer_assigned_identity() {
        let mut code = code_identity();
        code.signer_assigned_identity = None;
        let reference = SgxIdentity::Legacy(code);

        assert!(!is_identity_compatible_with_match_spec(
            &reference,
            &default_match_spec(true)
        ));
        assert!(matches!(
            set_expectation(&default_match_spec(true), &reference),
            Err(IdentityError::InvalidArgument(_))
        ));

        // Not required, so the reference is usable.
        assert!(is_identity_compatible_with_match_spec(
            &reference,
            &legacy_spec(u64::MAX)
        ));
        let expectation = set_expectation(&legacy_spec(u64::MAX), &reference).unwrap();
        assert!(is_valid_expectation(&expectation, true));
        assert!(match_identity_to_expectation(&reference, &expectation, true)
            .unwrap()
            .is_match());
    }

    #[test]
    fn test_compatibility_requires_same_legacy_shape() {
        assert!(is_identity_compatible_with_match_spec(
            &current_identity(),
            &strict_match_spec(false)
        ));
        assert!(!is_identity_compatible_with_match_spec(
            &current_identity(),
            &strict_match_spec(true)
        ));
        assert!(!is_identity_compatible_with_match_spec(
            &legacy_identity(),
            &strict_match_spec(false)
        ));
    }

    #[test]
    fn test_match_rejects_mixed_legacy() {
        let current = set_expectation(&default_match_spec(false), &current_identity()).unwrap();
        let legacy = set_expectation(&default_match_spec(true), &legacy_identity()).unwrap();

        assert!(match_identity_to_expectation(&current_identity(), &current, true).is_err());
        assert!(match_identity_to_expectation(&legacy_identity(), &legacy, false).is_err());
        assert!(match_identity_to_expectation(&legacy_identity(), &current, false).is_err());
    }

    #[test]
    fn test_legacy_match_ignores_machine_configuration() {
        let legacy = set_expectation(&strict_match_spec(true), &legacy_identity()).unwrap();
        let outcome = match_identity_to_expectation(&current_identity(), &legacy, true).unwrap();
        assert!(outcome.is_match());
    }

    #[test]
    fn test_identity_matches_itself_strictly() {
        for is_legacy in [true, false] {
            let identity = if is_legacy {
                legacy_identity()
            } else {
                current_identity()
            };
            let expectation = set_expectation(&strict_match_spec(is_legacy), &identity).unwrap();
            assert!(match_identity_to_expectation(&identity, &expectation, is_legacy)
                .unwrap()
                .is_match());
        }
    }

    #[test]
    fn test_strict_match_implies_default_match() {
        let reference = current_identity();
        let strict = set_expectation(&strict_match_spec(false), &reference).unwrap();
        let default = set_expectation(&default_match_spec(false), &reference).unwrap();

        let mut candidates = [current_identity(); 6];
        if let SgxIdentity::Current {
            code_identity,
            machine_configuration,
        } = &mut candidates[1]
        {
            code_identity.mrenclave = Sha256Hash([0x44; 32]);
            machine_configuration.cpu_svn.0[0] += 1;
        }
        if let SgxIdentity::Current { code_identity, .. } = &mut candidates[2] {
            code_identity.attributes.set(SecsAttributeBit::Debug);
        }
        if let SgxIdentity::Current { code_identity, .. } = &mut candidates[3] {
            code_identity.mrsigner = Sha256Hash([0x55; 32]);
        }
        if let SgxIdentity::Current { code_identity, .. } = &mut candidates[4] {
            code_identity.attributes.set(SecsAttributeBit::ProvisionKey);
        }
        if let SgxIdentity::Current {
            machine_configuration,
            ..
        } = &mut candidates[5]
        {
            machine_configuration.cpu_svn = CpuSvn([0; 16]);
        }

        for candidate in &candidates {
            let strict_match = match_identity_to_expectation(candidate, &strict, false)
                .unwrap()
                .is_match();
            let default_match = match_identity_to_expectation(candidate, &default, false)
                .unwrap()
                .is_match();
            assert!(!strict_match || default_match);
        }

        // Candidates 1 and 2 only differ in fields the default spec tolerates.
        assert!(match_identity_to_expectation(&candidates[1], &default, false)
            .unwrap()
            .is_match());
        assert!(match_identity_to_expectation(&candidates[2], &default, false)
            .unwrap()
            .is_match());
        assert!(!match_identity_to_expectation(&candidates[1], &strict, false)
            .unwrap()
            .is_match());
    }

    #[test]
    fn test_field_order_and_explanations() {
        let reference = current_identity();
        let expectation = set_expectation(&strict_match_spec(false), &reference).unwrap();

        let mut candidate = reference;
        if let SgxIdentity::Current {
            code_identity,
            machine_configuration,
        } = &mut candidate
        {
            code_identity.mrenclave = Sha256Hash([0x44; 32]);
            code_identity.mrsigner = Sha256Hash([0x55; 32]);
            machine_configuration.cpu_svn = CpuSvn([0; 16]);
        }
        let outcome = match_identity_to_expectation(&candidate, &expectation, false).unwrap();
        assert!(outcome.explanation().unwrap().starts_with("MRENCLAVE"));

        let mut candidate = reference;
        if let SgxIdentity::Current {
            machine_configuration,
            ..
        } = &mut candidate
        {
            machine_configuration.cpu_svn = CpuSvn([0; 16]);
        }
        let outcome = match_identity_to_expectation(&candidate, &expectation, false).unwrap();
        assert!(outcome.explanation().unwrap().starts_with("CPUSVN"));
    }

    #[test]
    fn test_signer_assigned_identity_rules() {
        let reference = legacy_identity();
        let expectation = set_expectation(&default_match_spec(true), &reference).unwrap();

        let mut code = *reference.code_identity();
        if let Some(sai) = code.signer_assigned_identity.as_mut() {
            sai.isv_svn += 1;
        }
        let newer = SgxIdentity::Legacy(code);
        assert!(match_identity_to_expectation(&newer, &expectation, true)
            .unwrap()
            .is_match());

        let mut code = *reference.code_identity();
        if let Some(sai) = code.signer_assigned_identity.as_mut() {
            sai.isv_svn -= 1;
        }
        let older = SgxIdentity::Legacy(code);
        let outcome = match_identity_to_expectation(&older, &expectation, true).unwrap();
        assert!(outcome.explanation().unwrap().starts_with("ISVSVN"));

        let mut code = *reference.code_identity();
        if let Some(sai) = code.signer_assigned_identity.as_mut() {
            sai.isv_family_id[0] = 1;
        }
        let other_family = SgxIdentity::Legacy(code);
        let outcome = match_identity_to_expectation(&other_family, &expectation, true).unwrap();
        assert!(outcome.explanation().unwrap().starts_with("ISVFAMILYID"));

        let mut code = *reference.code_identity();
        code.signer_assigned_identity = None;
        let missing = SgxIdentity::Legacy(code);
        let outcome = match_identity_to_expectation(&missing, &expectation, true).unwrap();
        assert_eq!(
            outcome.explanation(),
            Some("signer-assigned identity is required but the identity has none")
        );
    }
}
