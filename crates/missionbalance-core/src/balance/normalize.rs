//! Integer target percentages that always sum to exactly 100.
//!
//! Uses the largest-remainder (Hamilton) method with exact integer
//! arithmetic, so re-normalizing an already normalized list is a fixed
//! point.

/// Apportion 100 percentage points across `weights`.
///
/// * all-zero weights are spread evenly, the first `100 % n` entries getting
///   one extra point;
/// * otherwise each entry gets `floor(100 * w / total)` and the shortfall is
///   handed out one point at a time to the largest remainders, ties going to
///   the earlier entry.
///
/// An empty input yields an empty output.
pub fn normalize_percentages(weights: &[u32]) -> Vec<u32> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total == 0 {
        let base = 100 / n as u32;
        let extra = 100 - base * n as u32;
        return (0..n)
            .map(|i| if (i as u32) < extra { base + 1 } else { base })
            .collect();
    }

    let mut shares = Vec::with_capacity(n);
    let mut remainders = Vec::with_capacity(n);
    for (index, &weight) in weights.iter().enumerate() {
        let scaled = 100 * u64::from(weight);
        shares.push((scaled / total) as u32);
        remainders.push((index, scaled % total));
    }

    let assigned: u32 = shares.iter().sum();
    let shortfall = 100u32.saturating_sub(assigned) as usize;

    // Stable sort keeps list order among equal remainders.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for &(index, _) in remainders.iter().take(shortfall) {
        shares[index] += 1;
    }
    shares
}
