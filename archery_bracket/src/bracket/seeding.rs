//! Standard tournament seeding order.

/// Seed numbers in bracket position order for a bracket of `size` slots.
///
/// Consecutive pairs `(order[2k], order[2k + 1])` are the round-1 matchups.
/// The order is built by recursive halving: each seed `s` of the half-size
/// order is followed by its complement `size + 1 - s`, so the top seeds stay
/// maximally apart until the late rounds.
///
/// # Panics
///
/// Panics if `size` is not a power of two of at least 2. Callers validate
/// sizes against the allowed set first, so this is a programming error.
///
/// # Example
///
/// ```
/// use archery_bracket::bracket::seeding::seed_order;
///
/// assert_eq!(seed_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
/// ```
pub fn seed_order(size: u32) -> Vec<u32> {
    assert!(
        size >= 2 && size.is_power_of_two(),
        "seed_order requires a power-of-two size of at least 2, got {size}"
    );

    let mut order = vec![1, 2];
    let mut current = 2;
    while current < size {
        current *= 2;
        order = order
            .iter()
            .flat_map(|&seed| [seed, current + 1 - seed])
            .collect();
    }
    order
}
