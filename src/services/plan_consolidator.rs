use chrono::NaiveDate;
use tracing::debug;

use crate::models::plan::{label_for, PlanBlock};

/// Chronological order: date, then start time. Stable, so equal slots keep their order.
pub fn sort_plan(plan: &mut [PlanBlock]) {
    plan.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

/// A full replan supersedes the stored plan entirely.
pub fn replace_plan(_existing: Vec<PlanBlock>, regenerated: Vec<PlanBlock>) -> Vec<PlanBlock> {
    let mut plan = regenerated;
    sort_plan(&mut plan);
    plan
}

/// Swaps every block belonging to `item_name` for `blocks`, leaving other items untouched.
pub fn splice_item_blocks(
    existing: Vec<PlanBlock>,
    item_name: &str,
    blocks: Vec<PlanBlock>,
) -> Vec<PlanBlock> {
    let mut plan = remove_item_blocks(existing, item_name);
    plan.extend(blocks);
    sort_plan(&mut plan);
    plan
}

/// Drops blocks dated before `today`. Today's blocks survive even if already over.
pub fn drop_expired(plan: Vec<PlanBlock>, today: NaiveDate) -> Vec<PlanBlock> {
    let before = plan.len();
    let kept: Vec<PlanBlock> = plan.into_iter().filter(|block| block.date >= today).collect();
    if kept.len() != before {
        debug!(target: "app::planner", removed = before - kept.len(), %today, "expired plan blocks dropped");
    }
    kept
}

pub fn remove_item_blocks(plan: Vec<PlanBlock>, item_name: &str) -> Vec<PlanBlock> {
    plan.into_iter()
        .filter(|block| !block.is_for_item(item_name))
        .collect()
}

/// Points an item's blocks at its new name after a rename.
pub fn relabel_item_blocks(plan: &mut [PlanBlock], old_name: &str, new_name: &str) -> usize {
    let mut relabeled = 0;
    for block in plan.iter_mut().filter(|block| block.is_for_item(old_name)) {
        block.label = label_for(new_name);
        relabeled += 1;
    }
    relabeled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn block(day: u32, start: &str, end: &str, item: &str) -> PlanBlock {
        PlanBlock::for_item(date(day), start.to_string(), end.to_string(), item)
    }

    #[test]
    fn splice_replaces_only_the_target_item() {
        let existing = vec![
            block(3, "18:00", "19:00", "Essay"),
            block(4, "18:00", "19:00", "Midterm"),
            block(5, "18:00", "19:00", "essay"),
        ];
        let fresh = vec![block(4, "07:00", "08:00", "Essay")];

        let plan = splice_item_blocks(existing, "Essay", fresh);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0], block(4, "07:00", "08:00", "Essay"));
        assert_eq!(plan[1], block(4, "18:00", "19:00", "Midterm"));
    }

    #[test]
    fn splice_with_same_blocks_is_idempotent() {
        let fresh = vec![block(7, "13:00", "14:00", "Essay")];
        let once = splice_item_blocks(vec![block(3, "18:00", "19:00", "Midterm")], "Essay", fresh.clone());
        let twice = splice_item_blocks(once.clone(), "Essay", fresh);
        assert_eq!(once, twice);
    }

    #[test]
    fn expired_blocks_are_dropped_but_today_is_kept() {
        let plan = vec![
            block(2, "18:00", "19:00", "Essay"),
            block(3, "08:00", "09:00", "Essay"),
            block(4, "18:00", "19:00", "Essay"),
        ];
        let kept = drop_expired(plan, date(3));
        let dates: Vec<_> = kept.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(3), date(4)]);
    }

    #[test]
    fn replace_discards_previous_plan() {
        let plan = replace_plan(
            vec![block(3, "18:00", "19:00", "Old")],
            vec![block(5, "18:00", "19:00", "New"), block(4, "18:00", "19:00", "New")],
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].date, date(4));
        assert!(plan.iter().all(|b| b.is_for_item("New")));
    }

    #[test]
    fn relabel_follows_renamed_item() {
        let mut plan = vec![
            block(3, "18:00", "19:00", "Essay"),
            block(4, "18:00", "19:00", "Midterm"),
        ];
        assert_eq!(relabel_item_blocks(&mut plan, "essay", "History Essay"), 1);
        assert_eq!(plan[0].label, "Work on History Essay");
        assert_eq!(plan[1].label, "Work on Midterm");
    }

    #[test]
    fn removal_is_exact_on_label() {
        let plan = vec![
            block(3, "18:00", "19:00", "Essay"),
            block(3, "19:00", "20:00", "Essay Draft"),
        ];
        let kept = remove_item_blocks(plan, "Essay");
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_for_item("Essay Draft"));
    }
}
