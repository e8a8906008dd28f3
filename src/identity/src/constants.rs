// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::identity::SecsAttributeSet;

/// Authority type string stamped on every SGX identity envelope.
pub const SGX_AUTHORITY_TYPE: &str = "SGX";

pub const SHA256_DIGEST_SIZE: usize = 32;
pub const CPUSVN_SIZE: usize = 16;
pub const ATTRIBUTES_SIZE: usize = 16;
pub const ISV_EXT_PROD_ID_SIZE: usize = 16;
pub const ISV_FAMILY_ID_SIZE: usize = 16;
pub const CONFIG_ID_SIZE: usize = 64;
pub const REPORT_DATA_SIZE: usize = 64;
pub const KEY_ID_SIZE: usize = 32;
pub const MAC_SIZE: usize = 16;

pub const REPORT_BODY_SIZE: usize = 384;
pub const REPORT_SIZE: usize = REPORT_BODY_SIZE + KEY_ID_SIZE + MAC_SIZE;
pub const TARGETINFO_SIZE: usize = 512;

/// Bit positions inside the 128-bit SECS ATTRIBUTES field. Positions 0-63
/// live in `flags`, 64-127 in `xfrm`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecsAttributeBit {
    Init = 0,
    Debug = 1,
    Mode64Bit = 2,
    ProvisionKey = 4,
    InitTokenKey = 5,
    Kss = 7,
    AexNotify = 10,
    X87 = 64,
    Sse = 65,
    Avx = 66,
    Bndreg = 67,
    Bndcsr = 68,
    Opmask = 69,
    ZmmHi256 = 70,
    Hi16Zmm = 71,
    Pkru = 73,
    AmxTilecfg = 81,
    AmxTiledata = 82,
}

// Attributes cared about by the default match spec:
// Bit      Feature             Do-not-care     Notes
// 0        INIT                No              Always 1 in a report
// 1        DEBUG               Yes             Debug and production builds share a policy
// 2        MODE64BIT           No
// 4        PROVISIONKEY        No
// 5        EINITTOKENKEY       No
// 7        KSS                 Yes             Covered by the signer-assigned identity
// 10       AEXNOTIFY           Yes             Runtime choice of the enclave
// 63:11    Reserved            No              Always 0
// 64       X87                 No              Always enabled
// 65       SSE                 No              Always enabled
// 66       AVX                 Yes             Platform feature
// 68:67    MPX                 Yes             Platform feature
// 71:69    AVX512              Yes             Platform feature
// 73       PKRU                Yes             Platform feature
// 82:81    AMX                 Yes             Platform feature
pub const DEFAULT_DO_NOT_CARE_ATTRIBUTES: &[SecsAttributeBit] = &[
    SecsAttributeBit::Debug,
    SecsAttributeBit::Kss,
    SecsAttributeBit::AexNotify,
    SecsAttributeBit::Avx,
    SecsAttributeBit::Bndreg,
    SecsAttributeBit::Bndcsr,
    SecsAttributeBit::Opmask,
    SecsAttributeBit::ZmmHi256,
    SecsAttributeBit::Hi16Zmm,
    SecsAttributeBit::Pkru,
    SecsAttributeBit::AmxTilecfg,
    SecsAttributeBit::AmxTiledata,
];

/// Attribute match mask of the default match spec.
pub fn default_attributes_match_mask() -> SecsAttributeSet {
    !SecsAttributeSet::from_bits(DEFAULT_DO_NOT_CARE_ATTRIBUTES)
}

pub const STRICT_MISCSELECT_MATCH_MASK: u32 = u32::MAX;
pub const DEFAULT_MISCSELECT_MATCH_MASK: u32 = u32::MAX;
