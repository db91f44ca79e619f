//! Time-bucketed aggregation over a task collection.
//!
//! Every aggregator maps tasks into calendar buckets and hands back the
//! bucket key, its date range, and the member tasks; counting and
//! story-point math live on the bucket itself. The weekly boundary is the
//! dashboard's own anchoring (`due_date - (weekday + 1)` days, weekday
//! numbered from Monday), not a generic ISO week: buckets collect Monday
//! through Sunday and are labeled by the preceding Sunday.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::models::{Task, TaskList};

/// One calendar bucket: key, date range, and the tasks that fell into it.
#[derive(Debug, Clone)]
pub struct Bucket<'a, K> {
    pub key: K,
    /// First day covered by the bucket
    pub start: NaiveDate,
    /// Day after the last day covered
    pub end: NaiveDate,
    pub tasks: Vec<&'a Task>,
}

pub type DayBucket<'a> = Bucket<'a, NaiveDate>;
pub type WeekBucket<'a> = Bucket<'a, NaiveDate>;
pub type MonthBucket<'a> = Bucket<'a, (i32, u32)>;

impl<'a, K: Clone> Bucket<'a, K> {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Members that are completed and tagged as actions.
    pub fn completed_actions(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.is_action && t.is_completed())
            .count()
    }

    /// Members that are completed but not actions.
    pub fn completed_other(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| !t.is_action && t.is_completed())
            .count()
    }

    /// Members without a completion date.
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_completed()).count()
    }

    /// Sum of member story points; tasks without an estimate count as 0.
    pub fn story_point_total(&self) -> i64 {
        self.tasks.iter().filter_map(|t| t.story_points).sum()
    }

    /// The same bucket restricted to goal tasks. Key and date range are
    /// preserved even when no goals remain.
    pub fn only_goals(&self) -> Bucket<'a, K> {
        Bucket {
            key: self.key.clone(),
            start: self.start,
            end: self.end,
            tasks: self
                .tasks
                .iter()
                .copied()
                .filter(|t| t.is_goal())
                .collect(),
        }
    }
}

/// Derived view of any bucket sequence with each bucket's tasks filtered
/// down to goals.
pub fn goals_view<'a, K: Clone>(buckets: &[Bucket<'a, K>]) -> Vec<Bucket<'a, K>> {
    buckets.iter().map(Bucket::only_goals).collect()
}

/// Trailing daily window ending `today`, oldest day first.
///
/// One bucket per day is pre-seeded so charts show zero-filled gaps. A
/// task joins the bucket matching its due date when that date is present
/// and inside the window; completion state only affects the per-bucket
/// sub-counts.
pub fn daily_window<'a>(list: &'a TaskList, today: NaiveDate, days: u32) -> Vec<DayBucket<'a>> {
    if days == 0 {
        return Vec::new();
    }
    let window_start = today - Duration::days(i64::from(days) - 1);

    let mut buckets: Vec<DayBucket<'a>> = (0..days)
        .map(|offset| {
            let day = window_start + Duration::days(i64::from(offset));
            Bucket {
                key: day,
                start: day,
                end: day + Duration::days(1),
                tasks: Vec::new(),
            }
        })
        .collect();

    for task in list.tasks() {
        let Some(due) = task.due_date else { continue };
        if due < window_start || due > today {
            continue;
        }
        let pos = (due - window_start).num_days() as usize;
        buckets[pos].tasks.push(task);
    }

    buckets
}

/// Options for [`weekly_buckets`].
#[derive(Debug, Clone)]
pub struct WeeklyOptions {
    /// Reference day for the future-week exclusion
    pub today: NaiveDate,
    /// Drop tasks without a completion date
    pub completed_only: bool,
    /// Keep buckets whose week starts after `today`
    pub include_future: bool,
    /// Keep only the most recent N buckets (still returned oldest-first)
    pub recent: Option<usize>,
}

impl WeeklyOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            completed_only: false,
            include_future: false,
            recent: None,
        }
    }
}

/// The weekly bucket boundary for a due date.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()) + 1)
}

/// Group due-dated tasks into weekly buckets keyed by [`week_start`].
///
/// Only weeks with at least one member exist; there is no zero-fill.
/// Distinct keys are sorted ascending and, with `recent` set, sliced to
/// the tail, so callers always see the oldest of the displayed weeks
/// first.
pub fn weekly_buckets<'a>(list: &'a TaskList, opts: &WeeklyOptions) -> Vec<WeekBucket<'a>> {
    let mut weeks: BTreeMap<NaiveDate, Vec<&'a Task>> = BTreeMap::new();
    for task in list.tasks() {
        let Some(due) = task.due_date else { continue };
        if opts.completed_only && !task.is_completed() {
            continue;
        }
        weeks.entry(week_start(due)).or_default().push(task);
    }

    let mut buckets: Vec<WeekBucket<'a>> = weeks
        .into_iter()
        .filter(|(start, _)| opts.include_future || *start <= opts.today)
        .map(|(start, tasks)| Bucket {
            key: start,
            start,
            end: start + Duration::days(7),
            tasks,
        })
        .collect();

    if let Some(n) = opts.recent {
        if buckets.len() > n {
            buckets.drain(..buckets.len() - n);
        }
    }

    buckets
}

/// Group tasks into `(year, month)` buckets of their due date, ascending.
///
/// Membership requires both a due date and a completion date; there is no
/// zero-fill.
pub fn monthly_buckets<'a>(list: &'a TaskList) -> Vec<MonthBucket<'a>> {
    let mut months: BTreeMap<(i32, u32), Vec<&'a Task>> = BTreeMap::new();
    for task in list.tasks() {
        let Some(due) = task.due_date else { continue };
        if !task.is_completed() {
            continue;
        }
        months.entry((due.year(), due.month())).or_default().push(task);
    }

    months
        .into_iter()
        .map(|((year, month), tasks)| {
            let start = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start");
            let (next_year, next_month) = if month == 12 {
                (year + 1, 1)
            } else {
                (year, month + 1)
            };
            let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid month end");
            Bucket {
                key: (year, month),
                start,
                end,
                tasks,
            }
        })
        .collect()
}

/// The upcoming Sunday; a Sunday rolls over to the following one.
pub fn next_sunday(day: NaiveDate) -> NaiveDate {
    if day.weekday() == Weekday::Sun {
        day + Duration::days(7)
    } else {
        day + Duration::days(i64::from(6 - day.weekday().num_days_from_monday()))
    }
}

/// Differences between the current collection and a historical one.
#[derive(Debug)]
pub struct Delta<'a> {
    /// Tasks present now that the historical collection did not have
    pub added: Vec<&'a Task>,
    /// Ids the historical collection had that are gone now
    pub removed: Vec<String>,
    /// Tasks completed now that were incomplete (or absent) before
    pub newly_completed: Vec<&'a Task>,
}

/// Compare the current collection against an already-parsed historical
/// snapshot of the same outline.
pub fn collection_delta<'a>(current: &'a TaskList, historical: &TaskList) -> Delta<'a> {
    let mut added = Vec::new();
    let mut newly_completed = Vec::new();

    for task in current.tasks() {
        let previous = historical.get(&task.id);
        if previous.is_none() {
            added.push(task);
        }
        if task.is_completed() && previous.is_none_or(|p| !p.is_completed()) {
            newly_completed.push(task);
        }
    }

    let removed = historical
        .tasks()
        .iter()
        .filter(|t| current.get(&t.id).is_none())
        .map(|t| t.id.clone())
        .collect();

    Delta {
        added,
        removed,
        newly_completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, task};

    fn due(raw: &str, y: i32, m: u32, d: u32) -> String {
        format!(
            r#"{raw}, Due <time startYear="{y}" startMonth="{m}" startDay="{d}">x</time>"#
        )
    }

    // 2024-03-10 is a Sunday; 2024-03-11..17 run Monday through Sunday
    // and all share the bucket labeled by that Sunday.

    #[test]
    fn week_start_for_monday() {
        assert_eq!(week_start(date(2024, 3, 11)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_tuesday() {
        assert_eq!(week_start(date(2024, 3, 12)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_wednesday() {
        assert_eq!(week_start(date(2024, 3, 13)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_thursday() {
        assert_eq!(week_start(date(2024, 3, 14)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_friday() {
        assert_eq!(week_start(date(2024, 3, 15)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_saturday() {
        assert_eq!(week_start(date(2024, 3, 16)), date(2024, 3, 10));
    }

    #[test]
    fn week_start_for_sunday_rolls_back_a_full_week() {
        assert_eq!(week_start(date(2024, 3, 17)), date(2024, 3, 10));
        assert_eq!(week_start(date(2024, 3, 10)), date(2024, 3, 3));
    }

    #[test]
    fn daily_window_zero_fills_empty_collection() {
        let list = TaskList::new(Vec::new());
        let buckets = daily_window(&list, date(2024, 3, 31), 30);
        assert_eq!(buckets.len(), 30);
        assert!(buckets.iter().all(|b| b.count() == 0));
        assert_eq!(buckets[0].key, date(2024, 3, 2));
        assert_eq!(buckets[29].key, date(2024, 3, 31));
    }

    #[test]
    fn daily_window_assigns_by_due_date_and_splits_counts() {
        let list = TaskList::new(vec![
            task("a", None, &due("Act #Action", 2024, 3, 30), Some(10)),
            task("b", None, &due("Other", 2024, 3, 30), Some(20)),
            task("c", None, &due("Open", 2024, 3, 30), None),
            task("d", None, &due("Out of window", 2023, 1, 1), Some(30)),
            task("e", None, "No due date", Some(40)),
        ]);
        let buckets = daily_window(&list, date(2024, 3, 31), 30);

        let day = buckets.iter().find(|b| b.key == date(2024, 3, 30)).unwrap();
        assert_eq!(day.count(), 3);
        assert_eq!(day.completed_actions(), 1);
        assert_eq!(day.completed_other(), 1);
        assert_eq!(day.pending(), 1);

        let total: usize = buckets.iter().map(Bucket::count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn same_week_tasks_share_one_bucket() {
        let list = TaskList::new(vec![
            task("a", None, &due("One", 2024, 3, 11), None),
            task("b", None, &due("Two", 2024, 3, 16), None),
        ]);
        let buckets = weekly_buckets(&list, &WeeklyOptions::new(date(2024, 4, 1)));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, date(2024, 3, 10));
        assert_eq!(buckets[0].end, date(2024, 3, 17));
        assert_eq!(buckets[0].count(), 2);
    }

    #[test]
    fn weekly_skips_tasks_without_due_date() {
        let list = TaskList::new(vec![task("a", None, "No due", Some(5))]);
        assert!(weekly_buckets(&list, &WeeklyOptions::new(date(2024, 4, 1))).is_empty());
    }

    #[test]
    fn weekly_completed_only_filter() {
        let list = TaskList::new(vec![
            task("a", None, &due("Done", 2024, 3, 11), Some(5)),
            task("b", None, &due("Open", 2024, 3, 12), None),
        ]);
        let mut opts = WeeklyOptions::new(date(2024, 4, 1));
        opts.completed_only = true;
        let buckets = weekly_buckets(&list, &opts);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count(), 1);
        assert_eq!(buckets[0].tasks[0].id, "a");
    }

    #[test]
    fn weekly_drops_future_weeks_by_default() {
        let list = TaskList::new(vec![
            task("past", None, &due("P", 2024, 3, 11), None),
            task("future", None, &due("F", 2024, 4, 20), None),
        ]);
        let opts = WeeklyOptions::new(date(2024, 3, 20));
        let buckets = weekly_buckets(&list, &opts);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, date(2024, 3, 10));

        let mut all = opts.clone();
        all.include_future = true;
        assert_eq!(weekly_buckets(&list, &all).len(), 2);
    }

    #[test]
    fn weekly_recent_slices_the_tail_oldest_first() {
        let list = TaskList::new(vec![
            task("a", None, &due("A", 2024, 2, 5), None),
            task("b", None, &due("B", 2024, 2, 12), None),
            task("c", None, &due("C", 2024, 2, 19), None),
            task("d", None, &due("D", 2024, 2, 26), None),
        ]);
        let mut opts = WeeklyOptions::new(date(2024, 4, 1));
        opts.recent = Some(2);
        let buckets = weekly_buckets(&list, &opts);
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].key < buckets[1].key);
        assert_eq!(buckets[1].key, week_start(date(2024, 2, 26)));
    }

    #[test]
    fn monthly_requires_due_and_completion() {
        let list = TaskList::new(vec![
            task("a", None, &due("Done Mar", 2024, 3, 5), Some(5)),
            task("b", None, &due("Open Mar", 2024, 3, 6), None),
            task("c", None, "Done no due", Some(5)),
            task("d", None, &due("Done Jan", 2024, 1, 2), Some(5)),
        ]);
        let buckets = monthly_buckets(&list);
        let keys: Vec<(i32, u32)> = buckets.iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![(2024, 1), (2024, 3)]);
        assert_eq!(buckets[1].start, date(2024, 3, 1));
        assert_eq!(buckets[1].end, date(2024, 4, 1));
        assert_eq!(buckets[1].count(), 1);
    }

    #[test]
    fn monthly_december_rolls_into_january() {
        let list = TaskList::new(vec![task(
            "a",
            None,
            &due("Year end", 2023, 12, 30),
            Some(5),
        )]);
        let buckets = monthly_buckets(&list);
        assert_eq!(buckets[0].end, date(2024, 1, 1));
    }

    #[test]
    fn goals_view_preserves_bucket_range() {
        let list = TaskList::new(vec![
            task("g", None, &due("Goal #WeekGoal", 2024, 3, 11), None),
            task("t", None, &due("Chore", 2024, 3, 12), None),
        ]);
        let buckets = weekly_buckets(&list, &WeeklyOptions::new(date(2024, 4, 1)));
        let goals = goals_view(&buckets);
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].start, buckets[0].start);
        assert_eq!(goals[0].end, buckets[0].end);
        assert_eq!(goals[0].count(), 1);
        assert_eq!(goals[0].tasks[0].id, "g");
    }

    #[test]
    fn story_points_default_to_zero_in_sums() {
        let list = TaskList::new(vec![
            task("a", None, &due("Sized #3STP", 2024, 3, 11), Some(5)),
            task("b", None, &due("Unsized", 2024, 3, 12), Some(5)),
        ]);
        let buckets = weekly_buckets(&list, &WeeklyOptions::new(date(2024, 4, 1)));
        assert_eq!(buckets[0].story_point_total(), 3);
    }

    #[test]
    fn next_sunday_from_each_weekday() {
        // 2024-03-11 is a Monday
        assert_eq!(next_sunday(date(2024, 3, 11)), date(2024, 3, 17));
        assert_eq!(next_sunday(date(2024, 3, 16)), date(2024, 3, 17));
        // a Sunday rolls a full week forward
        assert_eq!(next_sunday(date(2024, 3, 17)), date(2024, 3, 24));
    }

    #[test]
    fn delta_reports_added_removed_and_newly_completed() {
        let old = TaskList::new(vec![
            task("kept", None, "Kept", None),
            task("gone", None, "Gone", None),
            task("was-open", None, "Was open", None),
            task("was-done", None, "Was done", Some(5)),
        ]);
        let new = TaskList::new(vec![
            task("kept", None, "Kept", None),
            task("was-open", None, "Was open", Some(10)),
            task("was-done", None, "Was done", Some(5)),
            task("fresh", None, "Fresh", Some(15)),
        ]);

        let delta = collection_delta(&new, &old);
        let added: Vec<&str> = delta.added.iter().map(|t| t.id.as_str()).collect();
        let completed: Vec<&str> = delta.newly_completed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(added, vec!["fresh"]);
        assert_eq!(delta.removed, vec!["gone".to_string()]);
        assert_eq!(completed, vec!["was-open", "fresh"]);
    }
}
