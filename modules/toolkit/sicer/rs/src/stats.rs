//! Poisson probabilities in log space.
//!
//! Island counts routinely sit hundreds of standard deviations above the background, where the
//! linear-space tail underflows to zero long before the ranking of islands stops mattering.

use statrs::function::factorial::ln_factorial;

/// Terms smaller than the running sum by this many nats no longer change an f64.
const NEGLIGIBLE: f64 = -40.0;

/// ln(e^a + e^b) without leaving log space.
pub fn ln_add_exp(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// ln P(X = k) for X ~ Poisson(lambda).
pub fn ln_poisson_pmf(k: u64, lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    k as f64 * lambda.ln() - lambda - ln_factorial(k)
}

/// ln P(X >= k) for X ~ Poisson(lambda).
pub fn ln_poisson_sf(k: u64, lambda: f64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    if lambda <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let ln_lambda = lambda.ln();
    if k as f64 > lambda {
        // Right of the mode every next term is smaller: sum upwards until they vanish
        let mut term = ln_poisson_pmf(k, lambda);
        let mut total = term;
        let mut i = k;
        loop {
            i += 1;
            term += ln_lambda - (i as f64).ln();
            total = ln_add_exp(total, term);
            if term - total < NEGLIGIBLE {
                return total;
            }
        }
    } else {
        // Left of the mode: sum P(X < k) downwards and take the complement
        let mut term = ln_poisson_pmf(k - 1, lambda);
        let mut total = term;
        let mut i = k - 1;
        while i > 0 {
            term += (i as f64).ln() - ln_lambda;
            i -= 1;
            total = ln_add_exp(total, term);
            if term - total < NEGLIGIBLE {
                break;
            }
        }
        (-total.exp()).ln_1p()
    }
}

/// One-sided enrichment p-value: P(X >= observed) when the observation exceeds the expectation,
/// 1 otherwise. A zero expectation makes any observation infinitely significant.
pub fn enrichment_pvalue(observed: u64, expected: f64) -> f64 {
    if expected <= 0.0 {
        0.0
    } else if observed as f64 <= expected {
        1.0
    } else {
        ln_poisson_sf(observed, expected).exp()
    }
}

/// Smallest k >= 1 with P(X >= k) <= pvalue, `pvalue` must be in (0, 1].
///
/// The tail is monotone in k: the upper bound is found by doubling from the mean and the answer
/// by bisection, so deep libraries need a logarithmic number of tail evaluations.
pub fn min_count_for_pvalue(lambda: f64, pvalue: f64) -> u32 {
    let cutoff = pvalue.ln();
    let passes = |k: u64| ln_poisson_sf(k, lambda) <= cutoff;

    let mut hi = (lambda.floor() as u64).max(1);
    while !passes(hi) {
        hi *= 2;
    }

    let mut lo = 1;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if passes(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo as u32
}
