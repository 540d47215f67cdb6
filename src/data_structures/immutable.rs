use std::ops::Deref;

/// Wrapper that only hands out shared references to its content.
///
/// Used for the structural parts of a [Schedule](crate::Schedule), which must not change
/// once the levels have been computed.
#[repr(transparent)]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Immutable<T>(T);

impl<T> Deref for Immutable<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Immutable<T> {
    fn from(i: T) -> Self {
        Self(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_through() {
        let levels: Immutable<Vec<u8>> = vec![3, 1, 2].into();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1], 1);
        assert_eq!(levels.iter().max(), Some(&3));
    }
}
