//! Nearest-week alignment of two weekly series.
//!
//! Supply and price are both weekly but are not guaranteed to carry the same
//! date for the same week. Each left-hand week is paired with the closest
//! right-hand week, provided the two are no more than a tolerance apart.

use chrono::NaiveDate;

use crate::model::Observation;

/// Default pairing tolerance: one week either side.
pub const DEFAULT_TOLERANCE_DAYS: i64 = 7;

/// A week present in both series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPoint {
    pub week: NaiveDate,
    pub left: f64,
    pub right: f64,
}

/// Pair each `left` observation with the nearest `right` observation.
///
/// Both inputs are sorted by week first; the output follows the left
/// series' weeks. On an exact distance tie the earlier right week wins.
/// Left weeks with no right week within `tolerance_days` are dropped.
pub fn align_nearest(
    left: &[Observation],
    right: &[Observation],
    tolerance_days: i64,
) -> Vec<AlignedPoint> {
    let mut left = left.to_vec();
    let mut right = right.to_vec();
    left.sort_by_key(|o| o.week);
    right.sort_by_key(|o| o.week);

    let mut out = Vec::with_capacity(left.len());
    // Index of the first right week >= the current left week.
    let mut cursor = 0usize;

    for l in &left {
        while cursor < right.len() && right[cursor].week < l.week {
            cursor += 1;
        }

        let before = cursor.checked_sub(1).map(|i| &right[i]);
        let after = right.get(cursor);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                let db = (l.week - b.week).num_days();
                let da = (a.week - l.week).num_days();
                if db <= da { Some((b, db)) } else { Some((a, da)) }
            }
            (Some(b), None) => Some((b, (l.week - b.week).num_days())),
            (None, Some(a)) => Some((a, (a.week - l.week).num_days())),
            (None, None) => None,
        };

        if let Some((r, distance)) = best {
            if distance <= tolerance_days {
                out.push(AlignedPoint {
                    week: l.week,
                    left: l.value,
                    right: r.value,
                });
            }
        }
    }

    out
}
