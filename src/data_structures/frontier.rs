use std::iter::FromIterator;

/// Worklist of a level by level walk: the level being drained and the level being filled.
///
/// Items [pushed](Frontier::push) while draining only come out after [Frontier::advance].
/// Inside a level items come out in LIFO order.
///
/// # Example
/// ```
/// # use rtlsim::data_structures::Frontier;
/// let mut frontier: Frontier<u8> = (0..3).collect();
/// assert_eq!(frontier.pop(), None);
///
/// frontier.advance();
/// assert_eq!(frontier.pop(), Some(2));
/// frontier.push(10);
/// assert_eq!(frontier.pop(), Some(1));
/// assert_eq!(frontier.pop(), Some(0));
/// assert_eq!(frontier.pop(), None);
///
/// frontier.advance();
/// assert_eq!(frontier.pop(), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct Frontier<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T> Frontier<T> {
    /// Takes an item from the level being drained.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        self.current.pop()
    }

    /// Queues an item for the following level.
    #[inline(always)]
    pub fn push(&mut self, v: T) {
        self.next.push(v);
    }

    /// Starts draining the queued level.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the current level hasn't been drained.
    pub fn advance(&mut self) {
        debug_assert!(
            self.current.is_empty(),
            "Tried to advance the frontier while the current level is not exhausted"
        );
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Returns true if there is nothing left to drain or queued.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }
}

/// The collected items form the first queued level.
impl<T> FromIterator<T> for Frontier<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            current: Vec::new(),
            next: iter.into_iter().collect(),
        }
    }
}
