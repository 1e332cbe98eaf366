//! Fixed-point radix-2 FFT over packed 16.16 complex lanes.
//!
//! Each `i32` lane carries one complex value: the real part in the high
//! 16 bits and the imaginary part in the low 16 bits, both signed Q15.
//! The transform runs entirely in the caller's buffer with wrapping
//! integer arithmetic, so results are bit-exact across platforms.
//!
//! Every butterfly stage halves its inputs before combining them, which
//! keeps the packed halves from overflowing: an `n`-point transform
//! returns the spectrum scaled by `1/n`.
//!
//! # Real input
//!
//! [`transform_real_in_place`] treats `n` lanes as `2n` real samples
//! (even samples in the high halves, odd samples in the low halves), runs
//! the `n`-point complex transform and unfolds the result into the first
//! half of the `2n`-point real spectrum.
//!
//! # Example
//!
//! ```rust
//! use spectap_core::fixed_fft::{lane_parts, pack_lane, transform_in_place};
//!
//! // A DC signal lands entirely in bin 0.
//! let mut lanes = [pack_lane(0x1000, 0); 8];
//! transform_in_place(&mut lanes);
//! assert_eq!(lane_parts(lanes[0]), (0x1000, 0));
//! assert!(lanes[1..].iter().all(|&v| v == 0));
//! ```

/// Log2 of [`MAX_FFT_SIZE`].
pub const LOG_FFT_SIZE: u32 = 10;

/// Largest supported transform, in complex lanes for [`transform_in_place`]
/// and in real samples for [`transform_real_in_place`].
pub const MAX_FFT_SIZE: usize = 1 << LOG_FFT_SIZE;

/// Quarter-circle rotation constants for angles `θ = 2πj/1024`, `j` in `0..256`.
///
/// Each entry packs `-sin θ` in the high half and `-cos θ` in the low half,
/// both Q15. Entries are reinterpreted as `i32` at the point of use.
pub(crate) static TWIDDLE: [u32; MAX_FFT_SIZE / 4] = [
    0x00008000, 0xff378001, 0xfe6e8002, 0xfda58006, 0xfcdc800a, 0xfc13800f,
    0xfb4a8016, 0xfa81801e, 0xf9b88027, 0xf8ef8032, 0xf827803e, 0xf75e804b,
    0xf6958059, 0xf5cd8068, 0xf5058079, 0xf43c808b, 0xf374809e, 0xf2ac80b2,
    0xf1e480c8, 0xf11c80de, 0xf05580f6, 0xef8d8110, 0xeec6812a, 0xedff8146,
    0xed388163, 0xec718181, 0xebab81a0, 0xeae481c1, 0xea1e81e2, 0xe9588205,
    0xe892822a, 0xe7cd824f, 0xe7078276, 0xe642829d, 0xe57d82c6, 0xe4b982f1,
    0xe3f4831c, 0xe3308349, 0xe26d8377, 0xe1a983a6, 0xe0e683d6, 0xe0238407,
    0xdf61843a, 0xde9e846e, 0xdddc84a3, 0xdd1b84d9, 0xdc598511, 0xdb998549,
    0xdad88583, 0xda1885be, 0xd95885fa, 0xd8988637, 0xd7d98676, 0xd71b86b6,
    0xd65c86f6, 0xd59e8738, 0xd4e1877b, 0xd42487c0, 0xd3678805, 0xd2ab884c,
    0xd1ef8894, 0xd13488dd, 0xd0798927, 0xcfbe8972, 0xcf0489be, 0xce4b8a0c,
    0xcd928a5a, 0xccd98aaa, 0xcc218afb, 0xcb698b4d, 0xcab28ba0, 0xc9fc8bf5,
    0xc9468c4a, 0xc8908ca1, 0xc7db8cf8, 0xc7278d51, 0xc6738dab, 0xc5c08e06,
    0xc50d8e62, 0xc45b8ebf, 0xc3a98f1d, 0xc2f88f7d, 0xc2488fdd, 0xc198903e,
    0xc0e990a1, 0xc03a9105, 0xbf8c9169, 0xbedf91cf, 0xbe329236, 0xbd86929e,
    0xbcda9307, 0xbc2f9371, 0xbb8593dc, 0xbadc9448, 0xba3394b5, 0xb98b9523,
    0xb8e39592, 0xb83c9603, 0xb7969674, 0xb6f196e6, 0xb64c9759, 0xb5a897ce,
    0xb5059843, 0xb46298b9, 0xb3c09930, 0xb31f99a9, 0xb27f9a22, 0xb1df9a9c,
    0xb1409b17, 0xb0a29b94, 0xb0059c11, 0xaf689c8f, 0xaecc9d0e, 0xae319d8e,
    0xad979e0f, 0xacfd9e91, 0xac659f14, 0xabcd9f98, 0xab36a01c, 0xaaa0a0a2,
    0xaa0aa129, 0xa976a1b0, 0xa8e2a238, 0xa84fa2c2, 0xa7bda34c, 0xa72ca3d7,
    0xa69ca463, 0xa60ca4f0, 0xa57ea57e, 0xa4f0a60c, 0xa463a69c, 0xa3d7a72c,
    0xa34ca7bd, 0xa2c2a84f, 0xa238a8e2, 0xa1b0a976, 0xa129aa0a, 0xa0a2aaa0,
    0xa01cab36, 0x9f98abcd, 0x9f14ac65, 0x9e91acfd, 0x9e0fad97, 0x9d8eae31,
    0x9d0eaecc, 0x9c8faf68, 0x9c11b005, 0x9b94b0a2, 0x9b17b140, 0x9a9cb1df,
    0x9a22b27f, 0x99a9b31f, 0x9930b3c0, 0x98b9b462, 0x9843b505, 0x97ceb5a8,
    0x9759b64c, 0x96e6b6f1, 0x9674b796, 0x9603b83c, 0x9592b8e3, 0x9523b98b,
    0x94b5ba33, 0x9448badc, 0x93dcbb85, 0x9371bc2f, 0x9307bcda, 0x929ebd86,
    0x9236be32, 0x91cfbedf, 0x9169bf8c, 0x9105c03a, 0x90a1c0e9, 0x903ec198,
    0x8fddc248, 0x8f7dc2f8, 0x8f1dc3a9, 0x8ebfc45b, 0x8e62c50d, 0x8e06c5c0,
    0x8dabc673, 0x8d51c727, 0x8cf8c7db, 0x8ca1c890, 0x8c4ac946, 0x8bf5c9fc,
    0x8ba0cab2, 0x8b4dcb69, 0x8afbcc21, 0x8aaaccd9, 0x8a5acd92, 0x8a0cce4b,
    0x89becf04, 0x8972cfbe, 0x8927d079, 0x88ddd134, 0x8894d1ef, 0x884cd2ab,
    0x8805d367, 0x87c0d424, 0x877bd4e1, 0x8738d59e, 0x86f6d65c, 0x86b6d71b,
    0x8676d7d9, 0x8637d898, 0x85fad958, 0x85beda18, 0x8583dad8, 0x8549db99,
    0x8511dc59, 0x84d9dd1b, 0x84a3dddc, 0x846ede9e, 0x843adf61, 0x8407e023,
    0x83d6e0e6, 0x83a6e1a9, 0x8377e26d, 0x8349e330, 0x831ce3f4, 0x82f1e4b9,
    0x82c6e57d, 0x829de642, 0x8276e707, 0x824fe7cd, 0x822ae892, 0x8205e958,
    0x81e2ea1e, 0x81c1eae4, 0x81a0ebab, 0x8181ec71, 0x8163ed38, 0x8146edff,
    0x812aeec6, 0x8110ef8d, 0x80f6f055, 0x80def11c, 0x80c8f1e4, 0x80b2f2ac,
    0x809ef374, 0x808bf43c, 0x8079f505, 0x8068f5cd, 0x8059f695, 0x804bf75e,
    0x803ef827, 0x8032f8ef, 0x8027f9b8, 0x801efa81, 0x8016fb4a, 0x800ffc13,
    0x800afcdc, 0x8006fda5, 0x8002fe6e, 0x8001ff37,
];

/// Packs a real and an imaginary Q15 value into one lane.
#[inline]
pub const fn pack_lane(re: i16, im: i16) -> i32 {
    ((re as i32) << 16) | (im as u16 as i32)
}

/// Splits a lane into its (real, imaginary) Q15 halves.
#[inline]
pub const fn lane_parts(v: i32) -> (i16, i16) {
    ((v >> 16) as i16, v as i16)
}

/// Packed complex product `conj(a) * b`.
///
/// The real half is `ar*br + ai*bi`, the imaginary half `ar*bi - ai*br`,
/// each renormalized from Q30 back to the lane's 16-bit half.
#[inline]
pub fn mult(a: i32, b: i32) -> i32 {
    let (ar, ai) = (a >> 16, i32::from(a as i16));
    let (br, bi) = (b >> 16, i32::from(b as i16));
    let re = ar.wrapping_mul(br).wrapping_add(ai.wrapping_mul(bi)) & !0xFFFF;
    let im = (ar.wrapping_mul(bi).wrapping_sub(ai.wrapping_mul(br)) >> 16) & 0xFFFF;
    re | im
}

/// Halves both packed halves of a lane, keeping each half's sign.
#[inline]
pub fn half(a: i32) -> i32 {
    ((a >> 1) & !0x8000) | (a & 0x8000)
}

#[inline]
fn twiddle(index: usize) -> i32 {
    TWIDDLE[index] as i32
}

fn assert_supported(n: usize, max: usize) {
    assert!(
        n.is_power_of_two() && n <= max,
        "fixed-point FFT size must be a power of two <= {max}, got {n}"
    );
}

/// Reorders `v` so that element `i` moves to the bit-reversed index of `i`.
///
/// The reversed counter is advanced without a lookup table: a single-bit mask
/// walks down from `n`, toggling bits of the running index until it sets
/// one that was previously clear.
///
/// # Panics
///
/// Panics if `v.len()` is not a power of two.
pub fn bit_reverse_permute<T>(v: &mut [T]) {
    let n = v.len();
    assert!(n.is_power_of_two(), "bit reversal length must be a power of two, got {n}");

    let mut r = 0usize;
    for i in 1..n {
        let mut p = n;
        loop {
            p >>= 1;
            r ^= p;
            if p & r != 0 {
                break;
            }
        }
        if i < r {
            v.swap(i, r);
        }
    }
}

/// In-place forward transform of `v.len()` packed complex lanes.
///
/// Output bin `k` holds `X[k] / n` where `X` is the unscaled DFT of the
/// input, up to fixed-point rounding.
///
/// # Panics
///
/// Panics if the length is not a power of two in `1..=MAX_FFT_SIZE`.
pub fn transform_in_place(v: &mut [i32]) {
    let n = v.len();
    assert_supported(n, MAX_FFT_SIZE);

    bit_reverse_permute(v);

    let mut scale = LOG_FFT_SIZE;
    let mut p = 1usize;
    while p < n {
        scale -= 1;
        let span = p << 1;

        for i in (0..n).step_by(span) {
            let x = half(v[i]);
            let y = half(v[i + p]);
            v[i] = x.wrapping_add(y);
            v[i + p] = x.wrapping_sub(y);
        }

        for r in 1..p {
            // Angles past a quarter turn fold back onto the table with the
            // imaginary half negated.
            let w = (MAX_FFT_SIZE / 4) as i32 - ((r as i32) << scale);
            let sign = w >> 31;
            let w = twiddle(((w ^ sign) - sign) as usize) ^ (sign << 16);

            for i in (r..n).step_by(span) {
                let x = half(v[i]);
                let y = mult(w, v[i + p]);
                v[i] = x.wrapping_sub(y);
                v[i + p] = x.wrapping_add(y);
            }
        }

        p = span;
    }
}

/// In-place forward transform of `2 * v.len()` real samples.
///
/// On input, lane `i` holds real samples `2i` (high half) and `2i + 1`
/// (low half). On output, lane `k` for `k` in `1..v.len()` holds bin `k`
/// of the real spectrum as (real, imaginary); lane 0 carries the DC term
/// in its high half and the Nyquist term in its low half.
///
/// # Panics
///
/// Panics if the length is not a power of two in `1..=MAX_FFT_SIZE / 2`.
pub fn transform_real_in_place(v: &mut [i32]) {
    let n = v.len();
    assert_supported(n, MAX_FFT_SIZE / 2);

    transform_in_place(v);

    let scale = LOG_FFT_SIZE - n.trailing_zeros() - 1;
    let m = n >> 1;

    // DC and Nyquist: rotate the conjugated first bin by 0.5 + 0.5i.
    v[0] = mult(!v[0], 0x8000_8000_u32 as i32);
    v[m] = half(v[m]);

    for i in 1..m {
        let x = half(v[i]);
        let z = half(v[n - i]);
        let y = z.wrapping_sub(x ^ 0xFFFF);
        let x = half(x.wrapping_add(z ^ 0xFFFF));
        let y = mult(y, twiddle(i << scale));
        v[i] = x.wrapping_sub(y);
        v[n - i] = x.wrapping_add(y) ^ 0xFFFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    fn magnitude(v: i32) -> f64 {
        let (re, im) = lane_parts(v);
        libm::hypot(f64::from(re), f64::from(im))
    }

    #[test]
    fn twiddle_table_matches_quarter_circle() {
        for (j, &entry) in TWIDDLE.iter().enumerate() {
            let theta = 2.0 * PI * j as f64 / MAX_FFT_SIZE as f64;
            let (hi, lo) = lane_parts(entry as i32);
            let sin = libm::round(-32768.0 * libm::sin(theta)) as i32;
            let cos = libm::round(-32768.0 * libm::cos(theta)) as i32;
            // -32768 * cos(0) == -32768 is the one value that fits exactly.
            assert!((i32::from(hi) - sin).abs() <= 1, "sin mismatch at {j}");
            assert!((i32::from(lo) - cos).abs() <= 1, "cos mismatch at {j}");
        }
    }

    #[test]
    fn pack_and_split_lane() {
        let v = pack_lane(-2, 3);
        assert_eq!(v, (-2 << 16) | 3);
        assert_eq!(lane_parts(v), (-2, 3));
        assert_eq!(lane_parts(pack_lane(i16::MIN, -1)), (i16::MIN, -1));
    }

    #[test]
    fn half_keeps_signs_of_both_halves() {
        assert_eq!(lane_parts(half(pack_lane(100, -100))), (50, -50));
        assert_eq!(lane_parts(half(pack_lane(-101, 101))), (-51, 50));
        assert_eq!(lane_parts(half(pack_lane(i16::MIN, i16::MIN))), (-16384, -16384));
    }

    #[test]
    fn mult_by_unit_halves_the_product() {
        // Q15 x Q15 lands back in a 16-bit half one bit short, so unit gain halves.
        let one = pack_lane(0x7fff, 0);
        assert_eq!(lane_parts(mult(one, pack_lane(0x2000, 0x1000))), (0x0fff, 0x07ff));
    }

    #[test]
    fn mult_conjugates_first_operand() {
        let i = pack_lane(0, 0x7fff);
        // conj(i) * 1 = -i
        let (re, im) = lane_parts(mult(i, pack_lane(0x4000, 0)));
        assert_eq!(re, 0);
        assert!((i32::from(im) + 0x2000).abs() <= 1, "im = {im}");
    }

    #[test]
    fn bit_reverse_small() {
        let mut v = [0, 1, 2, 3, 4, 5, 6, 7];
        bit_reverse_permute(&mut v);
        assert_eq!(v, [0, 4, 2, 6, 1, 5, 3, 7]);
    }

    #[test]
    fn zero_complex_input_stays_zero() {
        for log in 0..=LOG_FFT_SIZE {
            let mut v = [0i32; MAX_FFT_SIZE];
            transform_in_place(&mut v[..1 << log]);
            assert!(v.iter().all(|&x| x == 0), "non-zero output at n = {}", 1 << log);
        }
    }

    fn peak_bin(v: &[i32], skip_dc: bool) -> usize {
        let start = usize::from(skip_dc);
        (start..v.len())
            .max_by(|&a, &b| magnitude(v[a]).total_cmp(&magnitude(v[b])))
            .unwrap_or(0)
    }

    #[test]
    fn complex_tone_lands_in_its_bin() {
        let n = 256;
        let k = 16;
        let mut v = [0i32; 256];
        for (t, lane) in v.iter_mut().enumerate() {
            let phase = 2.0 * PI * (k * t) as f64 / n as f64;
            let re = libm::round(16000.0 * libm::cos(phase)) as i16;
            let im = libm::round(16000.0 * libm::sin(phase)) as i16;
            *lane = pack_lane(re, im);
        }
        transform_in_place(&mut v);

        let bin = peak_bin(&v, false);
        assert!(bin == k || bin == n - k, "peak at bin {bin}");

        // Scaled by 1/n, the peak sits near the input amplitude.
        let peak = magnitude(v[bin]);
        assert!(peak > 15000.0, "peak = {peak}");
        for (other, &lane) in v.iter().enumerate() {
            if other != bin {
                assert!(magnitude(lane) < 200.0, "leak at bin {other}: {}", magnitude(lane));
            }
        }
    }

    #[test]
    fn real_sine_concentrates_in_bin() {
        let samples = 512;
        let lanes = samples / 2;
        let k = 20;
        let mut v = [0i32; 256];
        for (i, lane) in v.iter_mut().enumerate() {
            let s = |t: usize| {
                let phase = 2.0 * PI * (k * t) as f64 / samples as f64;
                libm::round(16000.0 * libm::sin(phase)) as i16
            };
            *lane = pack_lane(s(2 * i), s(2 * i + 1));
        }
        transform_real_in_place(&mut v);

        let bin = peak_bin(&v, true);
        assert!(bin == k || bin == lanes - k, "peak at bin {bin}");

        let peak = magnitude(v[bin]);
        for (other, &lane) in v.iter().enumerate().skip(1) {
            if other != k && other != lanes - k {
                assert!(
                    magnitude(lane) * 8.0 < peak,
                    "bin {other} = {} against peak {peak}",
                    magnitude(lane)
                );
            }
        }
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two() {
        let mut v = [0i32; 12];
        transform_in_place(&mut v);
    }

    #[test]
    #[should_panic]
    fn rejects_oversized_real_transform() {
        let mut v = [0i32; MAX_FFT_SIZE];
        transform_real_in_place(&mut v);
    }
}
