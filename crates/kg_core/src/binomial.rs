//! Binomial sampling on an [`MrgState`] stream.
//!
//! Large `n*p` uses the BTRD transformed-rejection algorithm of Hörmann,
//! "The generation of binomial random variates" (J. Statist. Comput. Simul.
//! 46, 1993); small `n*p` falls back to inversion by sequential search. The
//! split point and every constant below are fixed: draw consumption is a
//! deterministic function of `(n, p)` and the stream position.

use crate::mrg::MrgState;

/// `n*p` at or above this runs the rejection sampler, below it inversion.
const BTRD_PIVOT: f64 = 10.0;

/// Stirling-series correction `ln(k!) - ln Stirling(k)` for the tail test.
fn stirling_correction(k: u64) -> f64 {
    const TABLE: [f64; 10] = [
        0.081_061_466_795_327_26,
        0.041_340_695_955_409_29,
        0.027_677_925_684_998_34,
        0.020_790_672_103_765_09,
        0.016_644_691_189_821_19,
        0.013_876_128_823_070_75,
        0.011_896_709_945_891_77,
        0.010_411_265_261_972_09,
        0.009_255_462_182_712_733,
        0.008_330_563_433_362_871,
    ];
    if k < 10 {
        TABLE[k as usize]
    } else {
        let kp1 = (k + 1) as f64;
        let sq = kp1 * kp1;
        (1.0 / 12.0 - (1.0 / 360.0 - 1.0 / 1260.0 / sq) / sq) / kp1
    }
}

/// Inversion by sequential search; one uniform per attempt, retried if
/// floating-point underflow walks the search past `n`.
fn sample_by_inversion(n: u64, p: f64, st: &mut MrgState) -> u64 {
    let q = 1.0 - p;
    let s = p / q;
    let a = (n as f64 + 1.0) * s;
    let r0 = q.powf(n as f64);
    loop {
        let mut r = r0;
        let mut u = st.next_double();
        let mut x: u64 = 0;
        loop {
            if u <= r {
                return x;
            }
            u -= r;
            x += 1;
            if x > n {
                break; // numerical tail; retry with a fresh uniform
            }
            r *= a / (x as f64) - s;
        }
    }
}

/// BTRD core. Requires `p <= 1/2` and `n*p >= BTRD_PIVOT`.
fn sample_by_btrd(n: u64, p: f64, st: &mut MrgState) -> u64 {
    let nf = n as f64;
    let m = ((nf + 1.0) * p).floor() as u64;
    let r = p / (1.0 - p);
    let nr = (nf + 1.0) * r;
    let npq = nf * p * (1.0 - p);
    let sqrt_npq = npq.sqrt();
    let b = 1.15 + 2.53 * sqrt_npq;
    let a = -0.0873 + 0.0248 * b + 0.01 * p;
    let c = nf * p + 0.5;
    let alpha = (2.83 + 5.1 / b) * sqrt_npq;
    let v_r = 0.92 - 4.2 / b;
    let u_rv_r = 0.86 * v_r;

    loop {
        let mut v = st.next_double();
        let mut u;
        if v <= u_rv_r {
            // Inside the rectangle of certain acceptance: no further test.
            u = v / v_r - 0.43;
            let k = ((2.0 * a / (0.5 - u.abs()) + b) * u + c).floor();
            return k as u64;
        }
        if v >= v_r {
            u = st.next_double() - 0.5;
        } else {
            u = v / v_r - 0.93;
            u = u.signum() * 0.5 - u;
            v = st.next_double() * v_r;
        }

        let us = 0.5 - u.abs();
        let kf = ((2.0 * a / us + b) * u + c).floor();
        if kf < 0.0 || kf > nf {
            continue;
        }
        let k = kf as u64;
        v = v * alpha / (a / (us * us) + b);
        let km = k.abs_diff(m);

        if km <= 15 {
            // Evaluate the ratio of pmf values directly.
            let mut f = 1.0;
            if m < k {
                for i in (m + 1)..=k {
                    f *= nr / (i as f64) - r;
                }
            } else if m > k {
                for i in (k + 1)..=m {
                    v *= nr / (i as f64) - r;
                }
            }
            if v <= f {
                return k;
            }
            continue;
        }

        // Squeeze acceptance/rejection around the normal approximation.
        let kmf = km as f64;
        v = v.ln();
        let rho = (kmf / npq) * (((kmf / 3.0 + 0.625) * kmf + 1.0 / 6.0) / npq + 0.5);
        let t = -kmf * kmf / (2.0 * npq);
        if v < t - rho {
            return k;
        }
        if v > t + rho {
            continue;
        }

        // Final test against the exact (Stirling-corrected) pmf ratio.
        let nm = n - m + 1;
        let h = ((m as f64) + 0.5) * (((m + 1) as f64) / (r * nm as f64)).ln()
            + stirling_correction(m)
            + stirling_correction(n - m);
        let nk = n - k + 1;
        let bound = h
            + (nf + 1.0) * ((nm as f64) / (nk as f64)).ln()
            + ((k as f64) + 0.5) * ((nk as f64) * r / ((k + 1) as f64)).ln()
            - stirling_correction(k)
            - stirling_correction(n - k);
        if v <= bound {
            return k;
        }
    }
}

/// Sample `Binomial(n, p)`, consuming draws from `st`.
pub fn sample_binomial(n: u64, p: f64, st: &mut MrgState) -> u64 {
    if n == 0 || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    if p > 0.5 {
        return n - sample_binomial(n, 1.0 - p, st);
    }
    if n as f64 * p < BTRD_PIVOT {
        sample_by_inversion(n, p, st)
    } else {
        sample_by_btrd(n, p, st)
    }
}
