use std::time::Duration;

use rand::{seq::SliceRandom, Rng};

/// Where the display should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    /// Empty or whitespace-only entry: hide the browser.
    Blank,
    Page(&'a str),
}

impl<'a> Destination<'a> {
    pub fn from_url(url: &'a str) -> Self {
        if url.trim().is_empty() {
            Self::Blank
        } else {
            Self::Page(url)
        }
    }
}

/// Cycles through a private copy of the configured URLs. The order is fixed
/// once built; shuffling happens only in [`RotationController::new`].
#[derive(Debug, Clone)]
pub struct RotationController {
    urls: Vec<String>,
    index: Option<usize>,
    period: Option<Duration>,
}

impl RotationController {
    /// Returns `None` for an empty list. A single URL gets no timer period.
    pub fn new<R: Rng + ?Sized>(
        urls: &[String],
        shuffle: bool,
        interval: Duration,
        rng: &mut R,
    ) -> Option<Self> {
        if urls.is_empty() {
            return None;
        }

        let mut urls = urls.to_vec();
        let period = if urls.len() > 1 {
            if shuffle {
                // Fisher-Yates: n from len-1 down to 1, k uniform in [0, n].
                urls.shuffle(rng);
            }
            Some(interval.max(Duration::from_secs(1)))
        } else {
            None
        };

        Some(Self {
            urls,
            index: None,
            period,
        })
    }

    pub fn timer_period(&self) -> Option<Duration> {
        self.period
    }

    #[cfg(test)]
    pub fn order(&self) -> &[String] {
        &self.urls
    }

    #[cfg(test)]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Moves to the next entry, wrapping at the end, and returns it.
    pub fn advance(&mut self) -> Destination<'_> {
        let next = match self.index {
            Some(i) if i + 1 < self.urls.len() => i + 1,
            _ => 0,
        };
        self.index = Some(next);
        Destination::from_url(&self.urls[next])
    }

    #[cfg(test)]
    pub fn current_url(&self) -> Option<&str> {
        self.index.map(|i| self.urls[i].as_str())
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<Destination<'_>> {
        self.current_url().map(Destination::from_url)
    }
}
