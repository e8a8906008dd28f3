// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::{format, string::ToString};
use core::convert::TryFrom;

use crate::{
    constants::{
        default_attributes_match_mask, DEFAULT_MISCSELECT_MATCH_MASK,
        STRICT_MISCSELECT_MATCH_MASK,
    },
    identity::SecsAttributeSet,
    message::{
        required, required_bytes, CodeIdentityMatchSpecMessage,
        MachineConfigurationMatchSpecMessage, SgxIdentityMatchSpecMessage,
    },
    IdentityError, Result,
};

/// Which code identity fields must match, and which bits of the bitfields
/// are cared about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeIdentityMatchSpec {
    pub is_mrenclave_match_required: bool,
    pub is_mrsigner_match_required: bool,
    pub is_signer_assigned_identity_match_required: bool,
    pub miscselect_match_mask: u32,
    pub attributes_match_mask: SecsAttributeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineConfigurationMatchSpec {
    /// CPUSVN must be at least as new as the reference, component by
    /// component.
    pub is_cpu_svn_match_required: bool,
    pub is_sgx_type_match_required: bool,
}

/// A policy over [`SgxIdentity`](crate::SgxIdentity) fields. A `Legacy`
/// spec never looks at the machine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SgxIdentityMatchSpec {
    Legacy(CodeIdentityMatchSpec),
    Current {
        code_identity: CodeIdentityMatchSpec,
        machine_configuration: MachineConfigurationMatchSpec,
    },
}

impl SgxIdentityMatchSpec {
    pub fn code_identity(&self) -> &CodeIdentityMatchSpec {
        match self {
            SgxIdentityMatchSpec::Legacy(code_identity) => code_identity,
            SgxIdentityMatchSpec::Current { code_identity, .. } => code_identity,
        }
    }

    pub fn machine_configuration(&self) -> Option<&MachineConfigurationMatchSpec> {
        match self {
            SgxIdentityMatchSpec::Legacy(_) => None,
            SgxIdentityMatchSpec::Current {
                machine_configuration,
                ..
            } => Some(machine_configuration),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, SgxIdentityMatchSpec::Legacy(_))
    }

    fn with_machine_configuration(
        code_identity: CodeIdentityMatchSpec,
        machine_configuration: MachineConfigurationMatchSpec,
        is_legacy: bool,
    ) -> Self {
        if is_legacy {
            SgxIdentityMatchSpec::Legacy(code_identity)
        } else {
            SgxIdentityMatchSpec::Current {
                code_identity,
                machine_configuration,
            }
        }
    }
}

/// The default match spec: MRSIGNER, the signer-assigned identity,
/// MISCSELECT and every ATTRIBUTES bit outside the default do-not-care set
/// must match; MRENCLAVE may change. Non-legacy specs also require the
/// CPUSVN to be at least the reference's.
pub fn default_match_spec(is_legacy: bool) -> SgxIdentityMatchSpec {
    SgxIdentityMatchSpec::with_machine_configuration(
        CodeIdentityMatchSpec {
            is_mrenclave_match_required: false,
            is_mrsigner_match_required: true,
            is_signer_assigned_identity_match_required: true,
            miscselect_match_mask: DEFAULT_MISCSELECT_MATCH_MASK,
            attributes_match_mask: default_attributes_match_mask(),
        },
        MachineConfigurationMatchSpec {
            is_cpu_svn_match_required: true,
            is_sgx_type_match_required: false,
        },
        is_legacy,
    )
}

/// The strictest match spec: every field is required and every bit is
/// cared about.
pub fn strict_match_spec(is_legacy: bool) -> SgxIdentityMatchSpec {
    SgxIdentityMatchSpec::with_machine_configuration(
        CodeIdentityMatchSpec {
            is_mrenclave_match_required: true,
            is_mrsigner_match_required: true,
            is_signer_assigned_identity_match_required: true,
            miscselect_match_mask: STRICT_MISCSELECT_MATCH_MASK,
            attributes_match_mask: SecsAttributeSet::all(),
        },
        MachineConfigurationMatchSpec {
            is_cpu_svn_match_required: true,
            is_sgx_type_match_required: true,
        },
        is_legacy,
    )
}

/// Checks that a match spec message sets every flag, carries masks of the
/// right width, and carries machine configuration rules iff it is not
/// legacy.
pub fn is_valid_match_spec(spec: &SgxIdentityMatchSpecMessage, is_legacy: bool) -> bool {
    match SgxIdentityMatchSpec::try_from(spec) {
        Ok(spec) => spec.is_legacy() == is_legacy,
        Err(_) => false,
    }
}

impl TryFrom<&CodeIdentityMatchSpecMessage> for CodeIdentityMatchSpec {
    type Error = IdentityError;

    fn try_from(message: &CodeIdentityMatchSpecMessage) -> Result<Self> {
        Ok(CodeIdentityMatchSpec {
            is_mrenclave_match_required: required(
                message.is_mrenclave_match_required,
                "is_mrenclave_match_required",
            )?,
            is_mrsigner_match_required: required(
                message.is_mrsigner_match_required,
                "is_mrsigner_match_required",
            )?,
            is_signer_assigned_identity_match_required: required(
                message.is_signer_assigned_identity_match_required,
                "is_signer_assigned_identity_match_required",
            )?,
            miscselect_match_mask: required(
                message.miscselect_match_mask,
                "miscselect_match_mask",
            )?,
            attributes_match_mask: SecsAttributeSet::from_bytes(&required_bytes(
                &message.attributes_match_mask,
                "attributes_match_mask",
            )?),
        })
    }
}

impl From<&CodeIdentityMatchSpec> for CodeIdentityMatchSpecMessage {
    fn from(spec: &CodeIdentityMatchSpec) -> Self {
        CodeIdentityMatchSpecMessage {
            is_mrenclave_match_required: Some(spec.is_mrenclave_match_required),
            is_mrsigner_match_required: Some(spec.is_mrsigner_match_required),
            is_signer_assigned_identity_match_required: Some(
                spec.is_signer_assigned_identity_match_required,
            ),
            miscselect_match_mask: Some(spec.miscselect_match_mask),
            attributes_match_mask: Some(hex::encode(spec.attributes_match_mask.to_bytes())),
        }
    }
}

impl TryFrom<&MachineConfigurationMatchSpecMessage> for MachineConfigurationMatchSpec {
    type Error = IdentityError;

    fn try_from(message: &MachineConfigurationMatchSpecMessage) -> Result<Self> {
        Ok(MachineConfigurationMatchSpec {
            is_cpu_svn_match_required: required(
                message.is_cpu_svn_match_required,
                "is_cpu_svn_match_required",
            )?,
            is_sgx_type_match_required: required(
                message.is_sgx_type_match_required,
                "is_sgx_type_match_required",
            )?,
        })
    }
}

impl From<&MachineConfigurationMatchSpec> for MachineConfigurationMatchSpecMessage {
    fn from(spec: &MachineConfigurationMatchSpec) -> Self {
        MachineConfigurationMatchSpecMessage {
            is_cpu_svn_match_required: Some(spec.is_cpu_svn_match_required),
            is_sgx_type_match_required: Some(spec.is_sgx_type_match_required),
        }
    }
}

impl TryFrom<&SgxIdentityMatchSpecMessage> for SgxIdentityMatchSpec {
    type Error = IdentityError;

    fn try_from(message: &SgxIdentityMatchSpecMessage) -> Result<Self> {
        let is_legacy = required(message.is_legacy, "is_legacy")?;
        let code_identity = message.code_identity_match_spec.as_ref().ok_or_else(|| {
            IdentityError::InvalidArgument("code_identity_match_spec is not set".to_string())
        })?;
        let code_identity = CodeIdentityMatchSpec::try_from(code_identity)?;

        match (is_legacy, message.machine_configuration_match_spec.as_ref()) {
            (true, None) => Ok(SgxIdentityMatchSpec::Legacy(code_identity)),
            (false, Some(machine_configuration)) => Ok(SgxIdentityMatchSpec::Current {
                code_identity,
                machine_configuration: MachineConfigurationMatchSpec::try_from(
                    machine_configuration,
                )?,
            }),
            (is_legacy, _) => Err(IdentityError::InvalidArgument(format!(
                "machine_configuration_match_spec is inconsistent with is_legacy = {}",
                is_legacy
            ))),
        }
    }
}

impl From<&SgxIdentityMatchSpec> for SgxIdentityMatchSpecMessage {
    fn from(spec: &SgxIdentityMatchSpec) -> Self {
        SgxIdentityMatchSpecMessage {
            is_legacy: Some(spec.is_legacy()),
            code_identity_match_spec: Some(CodeIdentityMatchSpecMessage::from(
                spec.code_identity(),
            )),
            machine_configuration_match_spec: spec
                .machine_configuration()
                .map(MachineConfigurationMatchSpecMessage::from),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::{SecsAttributeBit, DEFAULT_DO_NOT_CARE_ATTRIBUTES};

    #[test]
    fn test_presets_are_valid() {
        for is_legacy in [true, false] {
            let default = SgxIdentityMatchSpecMessage::from(&default_match_spec(is_legacy));
            let strict = SgxIdentityMatchSpecMessage::from(&strict_match_spec(is_legacy));
            assert!(is_valid_match_spec(&default, is_legacy));
            assert!(is_valid_match_spec(&strict, is_legacy));
            assert!(!is_valid_match_spec(&default, !is_legacy));
            assert!(!is_valid_match_spec(&strict, !is_legacy));
        }
    }

    #[test]
    fn test_default_spec() {
        let spec = default_match_spec(false);
        let code = spec.code_identity();
        assert!(!code.is_mrenclave_match_required);
        assert!(code.is_mrsigner_match_required);
        assert_eq!(code.miscselect_match_mask, u32::MAX);
        for bit in DEFAULT_DO_NOT_CARE_ATTRIBUTES {
            assert!(!code.attributes_match_mask.is_set(*bit));
        }
        assert!(code.attributes_match_mask.is_set(SecsAttributeBit::Init));
        assert!(code.attributes_match_mask.is_set(SecsAttributeBit::Mode64Bit));
        assert!(code.attributes_match_mask.is_set(SecsAttributeBit::ProvisionKey));
        assert!(code.attributes_match_mask.is_set(SecsAttributeBit::X87));
        assert!(
            spec.machine_configuration()
                .unwrap()
                .is_cpu_svn_match_required
        );
        assert!(default_match_spec(true).machine_configuration().is_none());
    }

    #[test]
    fn test_strict_spec() {
        let spec = strict_match_spec(false);
        let code = spec.code_identity();
        assert!(code.is_mrenclave_match_required);
        assert!(code.is_mrsigner_match_required);
        assert!(code.is_signer_assigned_identity_match_required);
        assert_eq!(code.attributes_match_mask, SecsAttributeSet::all());
        assert_eq!(
            spec.machine_configuration(),
            Some(&MachineConfigurationMatchSpec {
                is_cpu_svn_match_required: true,
                is_sgx_type_match_required: true,
            })
        );
        assert!(strict_match_spec(true).is_legacy());
    }

    #[test]
    fn test_strict_requires_everything_default_requires() {
        for is_legacy in [true, false] {
            let default = default_match_spec(is_legacy);
            let strict = strict_match_spec(is_legacy);
            let (d, s) = (default.code_identity(), strict.code_identity());

            assert!(!d.is_mrenclave_match_required || s.is_mrenclave_match_required);
            assert!(!d.is_mrsigner_match_required || s.is_mrsigner_match_required);
            assert!(
                !d.is_signer_assigned_identity_match_required
                    || s.is_signer_assigned_identity_match_required
            );
            assert_eq!(d.miscselect_match_mask & !s.miscselect_match_mask, 0);
            assert_eq!(
                d.attributes_match_mask & !s.attributes_match_mask,
                SecsAttributeSet::default()
            );
        }
    }

    #[test]
    fn test_unset_flag_is_invalid() {
        let mut message = SgxIdentityMatchSpecMessage::from(&default_match_spec(false));
        message
            .code_identity_match_spec
            .as_mut()
            .unwrap()
            .is_mrenclave_match_required = None;
        assert!(!is_valid_match_spec(&message, false));

        let mut message = SgxIdentityMatchSpecMessage::from(&default_match_spec(false));
        message
            .machine_configuration_match_spec
            .as_mut()
            .unwrap()
            .is_sgx_type_match_required = None;
        assert!(!is_valid_match_spec(&message, false));

        let mut message = SgxIdentityMatchSpecMessage::from(&default_match_spec(true));
        message.is_legacy = None;
        assert!(!is_valid_match_spec(&message, true));
    }

    #[test]
    fn test_mask_width_is_checked() {
        let mut message = SgxIdentityMatchSpecMessage::from(&strict_match_spec(false));
        message
            .code_identity_match_spec
            .as_mut()
            .unwrap()
            .attributes_match_mask = Some(hex::encode([0xffu8; 15]));
        assert!(!is_valid_match_spec(&message, false));

        let mut message = SgxIdentityMatchSpecMessage::from(&strict_match_spec(false));
        message
            .code_identity_match_spec
            .as_mut()
            .unwrap()
            .miscselect_match_mask = None;
        assert!(!is_valid_match_spec(&message, false));
    }

    #[test]
    fn test_legacy_machine_configuration_rules() {
        // Legacy spec carrying machine configuration rules.
        let mut message = SgxIdentityMatchSpecMessage::from(&default_match_spec(false));
        message.is_legacy = Some(true);
        assert!(!is_valid_match_spec(&message, true));

        // Non-legacy spec missing them.
        let mut message = SgxIdentityMatchSpecMessage::from(&default_match_spec(true));
        message.is_legacy = Some(false);
        assert!(!is_valid_match_spec(&message, false));
    }

    #[test]
    fn test_message_round_trip() {
        for spec in [
            default_match_spec(true),
            default_match_spec(false),
            strict_match_spec(true),
            strict_match_spec(false),
        ] {
            let message = SgxIdentityMatchSpecMessage::from(&spec);
            assert_eq!(SgxIdentityMatchSpec::try_from(&message).unwrap(), spec);
        }
    }
}
