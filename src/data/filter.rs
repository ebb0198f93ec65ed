use std::fmt;
use std::ops::RangeInclusive;

// ---------------------------------------------------------------------------
// YearRange – an inclusive span of years
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` span of years. Also used as the effective range
/// handed to chart renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// The range actually applied to a refresh pass.
pub type EffectiveRange = YearRange;

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        YearRange { start, end }
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years().contains(&year)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// FilterState – the shared start/end selection
// ---------------------------------------------------------------------------

/// Year selection shared by all charts.
///
/// Invariant: `bounds.start <= start < end <= bounds.end`. Start options
/// stop one year before the last supported year so that an end year can
/// always be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    bounds: YearRange,
    start: i32,
    end: i32,
}

impl FilterState {
    /// Full-range selection over `bounds`. `bounds` must span at least two
    /// years; a degenerate span is widened by one year.
    pub fn new(bounds: YearRange) -> Self {
        let end = bounds.end.max(bounds.start + 1);
        let bounds = YearRange::new(bounds.start, end);
        FilterState {
            bounds,
            start: bounds.start,
            end: bounds.end,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// The range a refresh should use.
    pub fn effective_range(&self) -> EffectiveRange {
        YearRange::new(self.start, self.end)
    }

    /// Whether the selection differs from the full default range.
    pub fn is_filtered(&self) -> bool {
        self.effective_range() != self.bounds
    }

    pub fn start_options(&self) -> RangeInclusive<i32> {
        self.bounds.start..=self.bounds.end - 1
    }

    /// End years that may be offered: every year after the current start.
    pub fn end_options(&self) -> RangeInclusive<i32> {
        self.start + 1..=self.bounds.end
    }

    /// Select a new start year. When the current end year is no longer
    /// after it, the end year is reset to the last supported year.
    pub fn set_start(&mut self, year: i32) {
        self.start = year.clamp(self.bounds.start, self.bounds.end - 1);
        if !self.end_options().contains(&self.end) {
            self.end = self.bounds.end;
        }
    }

    /// Select a new end year, clamped into [`Self::end_options`].
    pub fn set_end(&mut self, year: i32) {
        self.end = year.clamp(self.start + 1, self.bounds.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> FilterState {
        FilterState::new(YearRange::new(1960, 2023))
    }

    #[test]
    fn defaults_to_full_range() {
        let f = state();
        assert_eq!(f.effective_range(), YearRange::new(1960, 2023));
        assert!(!f.is_filtered());
        assert_eq!(f.start_options(), 1960..=2022);
    }

    #[test]
    fn end_options_are_after_start() {
        let mut f = state();
        f.set_start(2000);
        assert_eq!(f.end_options(), 2001..=2023);
        assert!(f.end_options().all(|y| y > f.start()));
    }

    #[test]
    fn set_start_past_end_resets_end_to_last_year() {
        let mut f = state();
        f.set_end(2010);
        f.set_start(2015);
        assert_eq!(f.start(), 2015);
        assert_eq!(f.end(), 2023);
        assert!(f.start() < f.end());
    }

    #[test]
    fn set_start_keeps_valid_end() {
        let mut f = state();
        f.set_end(2010);
        f.set_start(1990);
        assert_eq!(f.effective_range(), YearRange::new(1990, 2010));
        assert!(f.is_filtered());
    }

    #[test]
    fn selections_are_clamped_to_bounds() {
        let mut f = state();
        f.set_start(2023);
        assert_eq!(f.effective_range(), YearRange::new(2022, 2023));
        f.set_start(1900);
        assert_eq!(f.start(), 1960);
        f.set_end(1950);
        assert_eq!(f.end(), 1961);
        f.set_end(2100);
        assert_eq!(f.end(), 2023);
    }

    #[test]
    fn degenerate_bounds_are_widened() {
        let f = FilterState::new(YearRange::new(2000, 2000));
        assert_eq!(f.effective_range(), YearRange::new(2000, 2001));
    }
}
