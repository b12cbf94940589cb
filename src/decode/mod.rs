//! # Decode Module
//!
//! The decoder seam. The scan loop hands a [`Decoder`] the RGBA pixels of the
//! scan band and gets back a [`DecodedCode`], nothing, or an error. Only
//! [`rqrr`] ships as an implementation.

pub mod rqrr;

use crate::error::ScanResult;

pub use self::rqrr::RqrrDecoder;

/// Which luminance polarities the decoder tries, mirroring jsQR's
/// `inversionAttempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InversionAttempts {
    /// Dark modules on a light background only.
    #[default]
    DontInvert,
    /// Light modules on a dark background only.
    OnlyInvert,
    /// Normal first, then inverted.
    AttemptBoth,
    /// Inverted first, then normal.
    InvertFirst,
}

impl InversionAttempts {
    /// Polarities to try, in order. `true` means inverted.
    pub fn passes(&self) -> &'static [bool] {
        match self {
            InversionAttempts::DontInvert => &[false],
            InversionAttempts::OnlyInvert => &[true],
            InversionAttempts::AttemptBoth => &[false, true],
            InversionAttempts::InvertFirst => &[true, false],
        }
    }
}

impl std::str::FromStr for InversionAttempts {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dontInvert" | "dont-invert" => Ok(Self::DontInvert),
            "onlyInvert" | "only-invert" => Ok(Self::OnlyInvert),
            "attemptBoth" | "attempt-both" => Ok(Self::AttemptBoth),
            "invertFirst" | "invert-first" => Ok(Self::InvertFirst),
            other => Err(format!(
                "Invalid inversion mode: {}. Use: dont-invert, only-invert, attempt-both, invert-first",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub inversion_attempts: InversionAttempts,
}

/// RGBA8 pixels of the scan band, tightly packed.
#[derive(Debug, Clone, Copy)]
pub struct RegionPixels<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A successfully decoded code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    /// Decoded text payload.
    pub payload: String,
    /// Corner points in scan-band coordinates.
    pub corners: [Point; 4],
    /// Whether the hit came from the inverted pass.
    pub inverted: bool,
}

/// Matrix-code decoder.
///
/// `Ok(None)` means no code in this band and is the steady state. `Err` means
/// the input could not be processed; the scan loop logs it and moves on.
pub trait Decoder: Send {
    fn decode(
        &mut self,
        pixels: &RegionPixels<'_>,
        options: &DecodeOptions,
    ) -> ScanResult<Option<DecodedCode>>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inversion_passes() {
        assert_eq!(InversionAttempts::default().passes(), &[false]);
        assert_eq!(InversionAttempts::InvertFirst.passes(), &[true, false]);
        assert_eq!("attempt-both".parse(), Ok(InversionAttempts::AttemptBoth));
        assert_eq!("onlyInvert".parse(), Ok(InversionAttempts::OnlyInvert));
        assert!("sometimes".parse::<InversionAttempts>().is_err());
    }
}
