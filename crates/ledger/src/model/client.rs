use serde::{Deserialize, Serialize};

use verdant_core::{ClientId, DomainResult, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Loyalty tier derived from lifetime purchase count (engine-owned).
    pub bonus: u32,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            bonus: 0,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        super::require_name("client", &self.name)
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

/// Loyalty tier for a lifetime purchase count.
///
/// 0 → 0, 1–5 → 5, 6–10 → 10, 11+ → 15.
pub fn bonus_for_purchases(count: u64) -> u32 {
    match count {
        0 => 0,
        1..=5 => 5,
        6..=10 => 10,
        _ => 15,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(bonus_for_purchases(0), 0);
        assert_eq!(bonus_for_purchases(1), 5);
        assert_eq!(bonus_for_purchases(5), 5);
        assert_eq!(bonus_for_purchases(6), 10);
        assert_eq!(bonus_for_purchases(10), 10);
        assert_eq!(bonus_for_purchases(11), 15);
    }

    proptest! {
        /// Property: more purchases never lower the tier.
        #[test]
        fn tier_is_monotonic(a in 0u64..10_000, b in 0u64..10_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(bonus_for_purchases(lo) <= bonus_for_purchases(hi));
        }

        #[test]
        fn tier_is_one_of_the_four_steps(n in any::<u64>()) {
            prop_assert!([0, 5, 10, 15].contains(&bonus_for_purchases(n)));
        }
    }
}
