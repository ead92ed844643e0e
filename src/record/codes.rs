//! WFDB annotation code table.
//!
//! Annotation files store a 6-bit numeric code per event.  The rest of the
//! crate works with the printable mnemonics (`"N"`, `"+"`, `"["`, …) so the
//! segmenter can compare against the same symbols that appear in PhysioNet
//! documentation.

use std::borrow::Cow;

/// Code of the rhythm-change annotation (`"+"`).  Rhythm labels travel in
/// its aux string.
pub const RHYTHM: u8 = 28;
/// Start of ventricular flutter/fibrillation (`"["`).
pub const VFON: u8 = 32;
/// End of ventricular flutter/fibrillation (`"]"`).
pub const VFOFF: u8 = 33;

/// Highest code that can describe an annotation.  Values above this are
/// pseudo-codes (`SKIP`, `NUM`, `SUB`, `CHN`, `AUX`) used by the file format.
pub const ACMAX: u8 = 49;

/// Mnemonics indexed by annotation code, as printed by WFDB's `annstr`.
const MNEMONICS: [&str; 42] = [
    " ",  // 0  NOTQRS
    "N",  // 1  NORMAL
    "L",  // 2  LBBB
    "R",  // 3  RBBB
    "a",  // 4  ABERR
    "V",  // 5  PVC
    "F",  // 6  FUSION
    "J",  // 7  NPC
    "A",  // 8  APC
    "S",  // 9  SVPB
    "E",  // 10 VESC
    "j",  // 11 NESC
    "/",  // 12 PACE
    "Q",  // 13 UNKNOWN
    "~",  // 14 NOISE
    "",   // 15
    "|",  // 16 ARFCT
    "",   // 17
    "s",  // 18 STCH
    "T",  // 19 TCH
    "*",  // 20 SYSTOLE
    "D",  // 21 DIASTOLE
    "\"", // 22 NOTE
    "=",  // 23 MEASURE
    "p",  // 24 PWAVE
    "B",  // 25 BBB
    "^",  // 26 PACESP
    "t",  // 27 TWAVE
    "+",  // 28 RHYTHM
    "u",  // 29 UWAVE
    "?",  // 30 LEARN
    "!",  // 31 FLWAV
    "[",  // 32 VFON
    "]",  // 33 VFOFF
    "e",  // 34 AESC
    "n",  // 35 SVESC
    "@",  // 36 LINK
    "x",  // 37 NAPC
    "f",  // 38 PFUS
    "(",  // 39 WFON
    ")",  // 40 WFOFF
    "r",  // 41 RONT
];

/// Codes that mark a QRS complex (WFDB's `isqrs`).
const BEAT_CODES: [u8; 18] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 25, 34, 35, 38, 41];

/// Printable mnemonic for an annotation code.
///
/// Codes without an assigned mnemonic render as `[<code>]`, the same
/// fallback WFDB uses.
///
/// ```
/// use vf_dataset::record::codes::{mnemonic, VFOFF};
///
/// assert_eq!(mnemonic(1), "N");
/// assert_eq!(mnemonic(VFOFF), "]");
/// assert_eq!(mnemonic(45), "[45]");
/// ```
pub fn mnemonic(code: u8) -> Cow<'static, str> {
    match MNEMONICS.get(code as usize) {
        Some(s) if !s.is_empty() => Cow::Borrowed(*s),
        _ => Cow::Owned(format!("[{code}]")),
    }
}

/// Returns `true` when `mnemonic` names a beat annotation.
pub fn is_beat(mnemonic: &str) -> bool {
    BEAT_CODES
        .iter()
        .any(|&code| MNEMONICS[code as usize] == mnemonic)
}
