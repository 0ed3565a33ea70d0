use num_traits as num;

/// This trait represents the operations dense counts storage must be able to perform on its
/// underlying word type. Counts cross the storage boundary as `u64`, so every word must convert
/// to and (fallibly) from `u64`. `Bounded` tells the storage how large a count a single word can
/// hold before recording overflows.
pub trait Counter:
    num::Zero + num::FromPrimitive + num::Bounded + num::CheckedAdd + Copy + PartialEq + std::fmt::Debug
{
    /// Counter as a u64.
    fn as_u64(&self) -> u64;
}

impl Counter for u8 {
    #[inline]
    fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl Counter for u16 {
    #[inline]
    fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl Counter for u32 {
    #[inline]
    fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl Counter for u64 {
    #[inline]
    fn as_u64(&self) -> u64 {
        *self
    }
}
