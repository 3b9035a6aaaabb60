// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::{bail, ensure, Context as _};

/// Parses a human-readable byte size such as `512`, `64K`, `1.5M` or
/// `2GiB`. All suffixes are powers of 1024, whichever of the `K`/`KB`/`KiB`
/// spellings is used.
pub fn parse_byte_size(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    ensure!(!s.is_empty(), "empty size");

    let digits_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(digits_end);
    let value: f64 = number
        .parse()
        .with_context(|| format!("invalid size number {number:?}"))?;
    ensure!(value.is_finite() && value >= 0.0, "invalid size {s:?}");

    let exponent = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0u32,
        "k" | "kb" | "kib" => 1,
        "m" | "mb" | "mib" => 2,
        "g" | "gb" | "gib" => 3,
        "t" | "tb" | "tib" => 4,
        "p" | "pb" | "pib" => 5,
        _ => bail!("invalid size suffix {suffix:?}"),
    };

    Ok((value * 1024f64.powi(exponent as i32)) as u64)
}
