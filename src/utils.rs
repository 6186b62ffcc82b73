use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(test)]
#[path = "utils_test.rs"]
mod utils_test;

pub fn realtime() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

// Complement of one base; anything outside ACGTN (either case) is kept as-is
// so marker characters survive reverse complementing.
#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        _ => base,
    }
}

/// Reverse complement of a nucleotide sequence.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// True when every symbol is one of the four canonical bases (upper case).
#[inline]
pub fn all_atgc(seq: &[u8]) -> bool {
    seq.iter().all(|&b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

pub fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
