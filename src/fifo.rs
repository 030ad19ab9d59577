use std::collections::VecDeque;

/// Bounded pipeline buffer.
///
/// Admission into a full buffer is refused by the caller checking
/// [`Fifo::full`] or [`Fifo::can_fit`] first; enqueueing past the
/// capacity is an invariant violation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fifo<T> {
    name: String,
    inner: VecDeque<T>,
    max_size: Option<usize>,
}

impl<T> std::iter::IntoIterator for Fifo<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<T> std::fmt::Display for Fifo<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({:>2}/{:<2}){:#?}",
            self.name,
            self.inner.len(),
            self.max_size
                .map(|max| max.to_string())
                .as_deref()
                .unwrap_or(""),
            self.inner
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
        )
    }
}

impl<T> Fifo<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, max_size: Option<usize>) -> Self {
        Self {
            name: name.into(),
            inner: VecDeque::new(),
            max_size,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.max_size
    }

    #[must_use]
    pub fn iter(&self) -> std::collections::vec_deque::Iter<T> {
        self.inner.iter()
    }

    pub fn iter_mut(&mut self) -> std::collections::vec_deque::IterMut<T> {
        self.inner.iter_mut()
    }

    pub fn enqueue(&mut self, value: T) {
        assert!(
            !self.full(),
            "{}: enqueue into full buffer ({}/{:?})",
            self.name,
            self.inner.len(),
            self.max_size
        );
        self.inner.push_back(value);
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    /// Removes the entry at `index`, keeping the order of the others.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.inner.remove(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.inner.front()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    #[must_use]
    pub fn full(&self) -> bool {
        match self.max_size {
            Some(max) => self.inner.len() >= max,
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn can_fit(&self, n: usize) -> bool {
        match self.max_size {
            Some(max) => self.inner.len() + n <= max,
            None => true,
        }
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        self.inner.drain(..)
    }
}
