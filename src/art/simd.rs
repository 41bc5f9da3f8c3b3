//! Key-byte search for `Node16`.
//!
//! On x86_64 the 16 key bytes are compared against the target in one SSE2
//! instruction; other targets scan the sorted prefix of the array.

#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
use std::arch::x86_64::{__m128i, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8, _mm_set1_epi8};

/// Index of `byte` among the first `count` entries of `keys`.
#[inline]
pub(crate) fn find_byte(keys: &[u8; 16], count: usize, byte: u8) -> Option<usize> {
    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    {
        find_byte_sse2(keys, count, byte)
    }

    #[cfg(not(all(target_arch = "x86_64", target_feature = "sse2")))]
    {
        find_byte_scalar(keys, count, byte)
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
#[inline]
fn find_byte_sse2(keys: &[u8; 16], count: usize, byte: u8) -> Option<usize> {
    // SAFETY: sse2 is statically enabled for this target, and `keys` is
    // exactly 16 readable bytes; the unaligned load has no alignment needs.
    let bitfield = unsafe {
        let needle = _mm_set1_epi8(byte as i8);
        let haystack = _mm_loadu_si128(keys.as_ptr().cast::<__m128i>());
        _mm_movemask_epi8(_mm_cmpeq_epi8(needle, haystack)) as u32
    };
    // Slots past `count` hold stale bytes and must not match.
    let mask = (1u32 << count) - 1;
    match bitfield & mask {
        0 => None,
        hits => Some(hits.trailing_zeros() as usize),
    }
}

#[cfg_attr(all(target_arch = "x86_64", target_feature = "sse2"), allow(dead_code))]
#[inline]
fn find_byte_scalar(keys: &[u8; 16], count: usize, byte: u8) -> Option<usize> {
    keys[..count].iter().position(|&k| k == byte)
}
