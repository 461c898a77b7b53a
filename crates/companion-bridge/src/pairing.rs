//! Pairing codes for wireless companion connections.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use sha2::{Digest, Sha256};

use crate::error::PairingError;

const TOKEN_CHARS: usize = 8;
const MIN_DIMENSION: u32 = 120;

/// Render `descriptor` as an SVG QR code. Same input, same output.
pub fn make_pairing_code(descriptor: &str) -> Result<String, PairingError> {
    let code = encode(descriptor)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build())
}

/// Render `descriptor` as a QR code made of unicode half blocks, for
/// terminals.
pub fn render_terminal(descriptor: &str) -> Result<String, PairingError> {
    let code = encode(descriptor)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

/// Short fingerprint of `descriptor`, shown next to the code so the user can
/// check the device scanned the right one.
pub fn pairing_token(descriptor: &str) -> Result<String, PairingError> {
    let descriptor = non_empty(descriptor)?;
    let digest = Sha256::digest(descriptor.as_bytes());
    let mut token = URL_SAFE_NO_PAD.encode(digest);
    token.truncate(TOKEN_CHARS);
    Ok(token)
}

fn encode(descriptor: &str) -> Result<QrCode, PairingError> {
    let descriptor = non_empty(descriptor)?;
    QrCode::new(descriptor.as_bytes()).map_err(|err| PairingError::Encode(err.to_string().into()))
}

fn non_empty(descriptor: &str) -> Result<&str, PairingError> {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        Err(PairingError::EmptyDescriptor)
    } else {
        Ok(descriptor)
    }
}
