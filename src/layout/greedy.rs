use crate::error::{ensure_positive, LayoutError};
use crate::items::classify::AspectClass;
use crate::items::set::ItemId;
use crate::layout::skyline::ColumnState;

/// An item ready for ordering: its class and rendered height at the target column width.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: ItemId,
    pub class: AspectClass,
    pub height: f64,
}

/// Parameters for one ordering run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderParams {
    pub column_count: usize,
    pub gap: f64,
    /// Longest allowed run of consecutive wide items while narrow items remain
    pub max_wide_streak: usize,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            column_count: 4,
            gap: 16.0,
            max_wide_streak: 1,
        }
    }
}

/// Which pool members may be picked at the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidates {
    Any,
    /// The wide streak is at its limit
    NarrowOnly,
    /// Spending a narrow item now would leave too few to separate the remaining wide ones
    WideOnly,
}

impl Candidates {
    fn admits(self, class: AspectClass) -> bool {
        match self {
            Candidates::Any => true,
            Candidates::NarrowOnly => !class.is_wide(),
            Candidates::WideOnly => class.is_wide(),
        }
    }

    fn for_step(streak: usize, narrow_left: usize, wide_left: usize, max_streak: usize) -> Self {
        if streak >= max_streak && narrow_left > 0 {
            return Candidates::NarrowOnly;
        }
        if wide_left > 0 && narrow_left > 0 {
            // wide runs of up to `max_streak` need this many narrow separators
            let separators = wide_left.div_ceil(max_streak) - 1;
            if separators > narrow_left - 1 {
                return Candidates::WideOnly;
            }
        }
        Candidates::Any
    }
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    /// Position in the pool
    pos: usize,
    column: usize,
    span: usize,
    /// Tallest column after placing this candidate
    reach: f64,
}

fn best_candidate(
    items: &[OrderItem],
    pool: &[usize],
    columns: &ColumnState,
    candidates: Candidates,
    gap: f64,
) -> Option<Choice> {
    let current_max = columns.max_height();
    let mut best: Option<Choice> = None;

    for (pos, &idx) in pool.iter().enumerate() {
        let item = &items[idx];
        if !candidates.admits(item.class) {
            continue;
        }
        let span = item.class.span(columns.column_count());
        let (column, top) = columns.slot(span);
        let reach = current_max.max(top + item.height + gap);

        // strict: the earliest input item wins ties
        if best.map_or(true, |b| reach < b.reach) {
            best = Some(Choice {
                pos,
                column,
                span,
                reach,
            });
        }
    }
    best
}

/// Order items for a masonry grid of `column_count` columns.
///
/// Greedy best fit: each step places the item that keeps the tallest column
/// lowest, on the shortest column (or lowest adjacent pair for wide items).
/// Runs of wide items are capped at `max_wide_streak` while narrow items
/// remain, and narrow items are held back when they are needed to break up
/// the remaining wide ones. Returns a permutation of the input ids.
pub fn order(items: &[OrderItem], params: &OrderParams) -> Result<Vec<ItemId>, LayoutError> {
    if params.column_count < 2 {
        return Err(LayoutError::UnsupportedColumnCount(params.column_count));
    }
    if params.max_wide_streak == 0 {
        return Err(LayoutError::InvalidConfig(
            "max_wide_streak must be at least 1".into(),
        ));
    }
    if !params.gap.is_finite() || params.gap < 0.0 {
        return Err(LayoutError::invalid("gap", params.gap));
    }
    for item in items {
        ensure_positive("rendered height", item.height)?;
    }

    let mut columns = ColumnState::new(params.column_count);
    let mut pool: Vec<usize> = (0..items.len()).collect();
    let mut narrow_left = items.iter().filter(|item| !item.class.is_wide()).count();
    let mut streak = 0;
    let mut ordered = Vec::with_capacity(items.len());

    while !pool.is_empty() {
        let wide_left = pool.len() - narrow_left;
        let candidates =
            Candidates::for_step(streak, narrow_left, wide_left, params.max_wide_streak);

        let Some(choice) = best_candidate(items, &pool, &columns, candidates, params.gap)
            .or_else(|| best_candidate(items, &pool, &columns, Candidates::Any, params.gap))
        else {
            break;
        };

        let item = &items[pool.remove(choice.pos)];
        columns.place(choice.column, choice.span, item.height, params.gap);
        ordered.push(item.id.clone());

        if item.class.is_wide() {
            streak += 1;
        } else {
            streak = 0;
            narrow_left -= 1;
        }
    }

    tracing::debug!(
        "Ordered {} items for {} columns, projected height {:.0}",
        ordered.len(),
        params.column_count,
        columns.container_height(params.gap)
    );

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn narrow(id: u64, height: f64) -> OrderItem {
        OrderItem {
            id: id.into(),
            class: AspectClass::Narrow,
            height,
        }
    }

    fn wide(id: u64, height: f64) -> OrderItem {
        OrderItem {
            id: id.into(),
            class: AspectClass::Wide,
            height,
        }
    }

    fn params(column_count: usize) -> OrderParams {
        OrderParams {
            column_count,
            gap: 10.0,
            max_wide_streak: 1,
        }
    }

    fn raw(ids: &[ItemId]) -> Vec<u64> {
        ids.iter().map(|id| id.as_str().parse().unwrap()).collect()
    }

    #[test]
    fn empty_input_orders_to_empty() {
        assert!(order(&[], &params(2)).unwrap().is_empty());
        assert!(order(&[], &params(4)).unwrap().is_empty());
    }

    #[test]
    fn fewer_than_two_columns_is_unsupported() {
        assert_eq!(
            order(&[narrow(1, 100.0)], &params(1)),
            Err(LayoutError::UnsupportedColumnCount(1))
        );
        assert_eq!(order(&[], &params(0)), Err(LayoutError::UnsupportedColumnCount(0)));
    }

    #[test]
    fn invalid_heights_and_streak_limits_are_rejected() {
        assert!(matches!(
            order(&[narrow(1, 0.0)], &params(2)),
            Err(LayoutError::InvalidDimension { .. })
        ));
        let no_wide = OrderParams {
            max_wide_streak: 0,
            ..params(2)
        };
        assert!(matches!(order(&[], &no_wide), Err(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn single_wide_item_among_narrow_ones() {
        // 4 columns of 290px, gap 10: ratios 1.0, 1.78, 1.0, 0.75
        let items = vec![
            narrow(1, 290.0),
            wide(2, 590.0 / 1.78),
            narrow(3, 290.0),
            narrow(4, 290.0 / 0.75),
        ];
        let ordered = order(&items, &params(4)).unwrap();
        assert_eq!(ordered.len(), 4);
        assert_eq!(ordered.iter().collect::<HashSet<_>>().len(), 4);
    }

    #[test]
    fn narrow_item_is_forced_between_two_wide_ones() {
        // 2 columns of 190px: wide items are 390 / 1.78 ~ 219px, the square one 190px.
        // By height alone the square item would go first and leave the wide pair adjacent.
        let items = vec![wide(1, 390.0 / 1.78), wide(2, 390.0 / 1.78), narrow(3, 190.0)];
        let ordered = order(&items, &params(2)).unwrap();
        assert_eq!(raw(&ordered), vec![1, 3, 2]);
    }

    #[test]
    fn streak_limit_breaks_runs_of_wide_items() {
        let items = vec![
            wide(1, 100.0),
            wide(2, 100.0),
            wide(3, 100.0),
            narrow(4, 500.0),
            narrow(5, 500.0),
        ];
        let ordered = order(&items, &params(4)).unwrap();
        assert_eq!(raw(&ordered), vec![1, 4, 2, 5, 3]);
    }

    #[test]
    fn longer_streaks_when_configured() {
        let items = vec![wide(1, 100.0), wide(2, 100.0), wide(3, 100.0), narrow(4, 500.0)];
        let relaxed = OrderParams {
            max_wide_streak: 2,
            ..params(4)
        };
        let ordered = order(&items, &relaxed).unwrap();
        assert_eq!(raw(&ordered), vec![1, 2, 4, 3]);
    }

    #[test]
    fn all_wide_items_keep_their_order() {
        let items = vec![wide(1, 100.0), wide(2, 100.0), wide(3, 100.0)];
        let ordered = order(&items, &params(2)).unwrap();
        assert_eq!(raw(&ordered), vec![1, 2, 3]);
    }

    #[test]
    fn shortest_reach_wins_and_ties_keep_input_order() {
        // column heights start equal, so the shortest item keeps the grid lowest
        let items = vec![narrow(1, 300.0), narrow(2, 100.0), narrow(3, 100.0)];
        let ordered = order(&items, &params(2)).unwrap();
        assert_eq!(raw(&ordered), vec![2, 3, 1]);
    }

    #[test]
    fn balances_column_growth() {
        let items = vec![
            narrow(1, 400.0),
            narrow(2, 400.0),
            narrow(3, 100.0),
            narrow(4, 100.0),
            narrow(5, 100.0),
            narrow(6, 100.0),
        ];
        let ordered = order(&items, &params(2)).unwrap();

        let mut columns = ColumnState::new(2);
        let by_id: std::collections::HashMap<_, _> =
            items.iter().map(|item| (item.id.clone(), item.height)).collect();
        for id in &ordered {
            let (column, _) = columns.slot(1);
            columns.place(column, 1, by_id[id], 10.0);
        }
        // 400 + 100 + 100 per column
        assert_eq!(columns.heights(), &[630.0, 630.0]);
    }

    fn arb_items() -> impl Strategy<Value = Vec<OrderItem>> {
        prop::collection::vec((prop::bool::weighted(0.35), 20.0f64..900.0), 0..48).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (is_wide, height))| OrderItem {
                        id: (i as u64).into(),
                        class: if is_wide { AspectClass::Wide } else { AspectClass::Narrow },
                        height,
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn ordering_is_a_permutation(items in arb_items(), four in any::<bool>()) {
            let column_count = if four { 4 } else { 2 };
            let ordered = order(&items, &params(column_count)).unwrap();

            let mut expected: Vec<ItemId> = items.iter().map(|item| item.id.clone()).collect();
            let mut actual = ordered.clone();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn wide_streak_never_exceeds_limit_while_narrow_items_remain(
            items in arb_items(),
            four in any::<bool>(),
            max_wide_streak in 1usize..4,
        ) {
            let params = OrderParams {
                column_count: if four { 4 } else { 2 },
                gap: 12.0,
                max_wide_streak,
            };
            let ordered = order(&items, &params).unwrap();

            let wide: HashSet<&ItemId> = items
                .iter()
                .filter(|item| item.class.is_wide())
                .map(|item| &item.id)
                .collect();
            let mut narrow_left = items.len() - wide.len();
            let mut streak = 0;
            for id in &ordered {
                if wide.contains(id) {
                    prop_assert!(
                        streak < max_wide_streak || narrow_left == 0,
                        "wide run longer than {} with {} narrow items left",
                        max_wide_streak,
                        narrow_left
                    );
                    streak += 1;
                } else {
                    streak = 0;
                    narrow_left -= 1;
                }
            }
        }
    }
}
