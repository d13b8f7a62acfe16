//! Treasury view selection.
//!
//! The backend pre-aggregates treasury balances into four SQL views (daily,
//! weekly, biweekly, monthly client totals). The client picks the finest view
//! whose expected row count for a requested day-span stays under
//! [`MAX_SERIES_POINTS`], and additionally caps the query with that limit so
//! a misbehaving view can never flood a card.

use crate::Widget;

/// Upper bound on the points a balance series card will request.
///
/// A terminal chart can't usefully render more columns than this, and the
/// limit doubles as the defensive `limit=` applied to every series query.
pub const MAX_SERIES_POINTS: usize = 120;

/// One of the four pre-aggregated treasury views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasuryView {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl TreasuryView {
    /// Select the finest view that keeps a `days`-long span under the cap.
    ///
    /// Spans beyond what monthly buckets can hold still map to `Monthly`;
    /// there is no coarser view, the row limit truncates the tail instead.
    #[must_use]
    pub fn for_span(days: u32) -> Self {
        const CAP: u32 = MAX_SERIES_POINTS as u32;
        if days <= CAP {
            Self::Daily
        } else if days.div_ceil(7) <= CAP {
            Self::Weekly
        } else if days.div_ceil(14) <= CAP {
            Self::Biweekly
        } else {
            Self::Monthly
        }
    }

    /// The widget bundle that queries this view.
    #[must_use]
    pub const fn widget(self) -> Widget {
        match self {
            Self::Daily => Widget::TreasuryClientTotals,
            Self::Weekly => Widget::TreasuryWeeklyClientTotals,
            Self::Biweekly => Widget::TreasuryBiweeklyClientTotals,
            Self::Monthly => Widget::TreasuryMonthlyClientTotals,
        }
    }

    /// Defensive row cap for series queries against this view.
    #[must_use]
    pub const fn row_limit(self) -> usize {
        MAX_SERIES_POINTS
    }

    /// Days covered by one bucket of this view.
    #[must_use]
    pub const fn bucket_days(self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::Monthly => 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_SERIES_POINTS, TreasuryView};
    use crate::Widget;

    #[test]
    fn short_spans_stay_daily() {
        assert_eq!(TreasuryView::for_span(0), TreasuryView::Daily);
        assert_eq!(TreasuryView::for_span(1), TreasuryView::Daily);
        assert_eq!(TreasuryView::for_span(31), TreasuryView::Daily);
        assert_eq!(TreasuryView::for_span(120), TreasuryView::Daily);
    }

    #[test]
    fn each_threshold_picks_the_next_view() {
        assert_eq!(TreasuryView::for_span(121), TreasuryView::Weekly);
        assert_eq!(TreasuryView::for_span(840), TreasuryView::Weekly);
        assert_eq!(TreasuryView::for_span(841), TreasuryView::Biweekly);
        assert_eq!(TreasuryView::for_span(1680), TreasuryView::Biweekly);
        assert_eq!(TreasuryView::for_span(1681), TreasuryView::Monthly);
    }

    #[test]
    fn absurd_spans_saturate_to_monthly() {
        assert_eq!(TreasuryView::for_span(u32::MAX), TreasuryView::Monthly);
    }

    #[test]
    fn selected_view_never_exceeds_cap_until_monthly() {
        for days in 0..=1680 {
            let view = TreasuryView::for_span(days);
            let points = days.div_ceil(view.bucket_days()).max(1);
            assert!(
                points as usize <= MAX_SERIES_POINTS,
                "span {days} via {view:?} yields {points} points"
            );
        }
    }

    #[test]
    fn views_map_to_their_widgets() {
        assert_eq!(TreasuryView::Daily.widget(), Widget::TreasuryClientTotals);
        assert_eq!(TreasuryView::Weekly.widget(), Widget::TreasuryWeeklyClientTotals);
        assert_eq!(TreasuryView::Biweekly.widget(), Widget::TreasuryBiweeklyClientTotals);
        assert_eq!(TreasuryView::Monthly.widget(), Widget::TreasuryMonthlyClientTotals);
    }
}
