use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

/// Bitmask over effect slots (bit `i` = effect index `i`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectMask(pub u32);

impl EffectMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    pub const fn single(index: u8) -> Self {
        Self(1 << index)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn has(self, index: u8) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    pub fn insert(&mut self, index: u8) {
        self.0 |= 1 << index;
    }

    pub fn remove(&mut self, index: u8) {
        self.0 &= !(1 << index);
    }

    pub const fn contains(self, other: EffectMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Effect indices set in this mask, ascending.
    pub fn indices(self) -> impl Iterator<Item = u8> {
        (0u8..32).filter(move |i| self.has(*i))
    }
}

impl BitOr for EffectMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EffectMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EffectMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for EffectMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for EffectMask {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for EffectMask {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for EffectMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_ascending() {
        let mask = EffectMask(0b1010_0001);
        let indices: Vec<u8> = mask.indices().collect();
        assert_eq!(indices, vec![0, 5, 7]);
        assert_eq!(mask.count(), 3);
    }

    #[test]
    fn contains_is_subset_check() {
        let declared = EffectMask(0b111);
        assert!(declared.contains(EffectMask(0b101)));
        assert!(!declared.contains(EffectMask(0b1001)));
        assert!(declared.contains(EffectMask::NONE));
    }
}
