//! Terminal rendering of pairing QR codes.

use crate::error::PairingError;
use crate::Result;
use qrcode::{Color, EcLevel, QrCode};
use std::io::Write;

/// Something that can show a pairing code to the user.
pub trait QrRenderer: Send + Sync {
    fn render(&self, code: &str) -> Result<()>;
}

/// Render `data` as a QR code using Unicode half blocks, two module rows per
/// text line, with low error correction and a two-module quiet zone.
pub fn render_half_block(data: &str) -> Result<String> {
    const QUIET: usize = 2;

    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| PairingError::Protocol(format!("QR generation failed: {e}")))?;
    let width = code.width();
    let colors = code.into_colors();
    let size = width + 2 * QUIET;
    let is_dark = |row: usize, col: usize| -> bool {
        let (Some(r), Some(c)) = (row.checked_sub(QUIET), col.checked_sub(QUIET)) else {
            return false;
        };
        r < width && c < width && colors[r * width + c] == Color::Dark
    };

    let mut out = String::with_capacity((size + 1) * size.div_ceil(2) * 3);
    for row in (0..size).step_by(2) {
        for col in 0..size {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}

/// Writes the QR for the user to scan on standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalQr;

impl QrRenderer for TerminalQr {
    fn render(&self, code: &str) -> Result<()> {
        let block = render_half_block(code)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "QR code received, scan it with your phone!")
            .and_then(|_| stdout.write_all(block.as_bytes()))
            .and_then(|_| stdout.flush())
            .map_err(|e| anyhow::anyhow!("writing QR code to stdout: {e}"))?;
        Ok(())
    }
}
