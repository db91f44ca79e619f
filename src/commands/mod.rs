//! Command implementations for the ptm CLI.
//!
//! Each command returns an output struct that serializes to JSON (the
//! default) or renders a human-readable form with `-H`. The report logic
//! is split into pure `*_report` functions over an already-parsed task
//! collection so it can be tested without any storage or network.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::aggregate::{self, WeeklyOptions};
use crate::config::Config;
use crate::models::{Task, TaskList, TaskRow};
use crate::storage::Store;
use crate::store::TaskStore;
use crate::Result;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Serialize to JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

fn format_due(due: Option<NaiveDate>) -> String {
    match due {
        Some(date) => date.format("%b %d").to_string(),
        None => "(none)".to_string(),
    }
}

/// One task in a listing: display name, ancestor breadcrumb, tags.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub name: String,
    /// Ancestor names root-first, `" > "` separated
    pub ancestors: String,
    pub tags: Vec<String>,
}

fn summarize(list: &TaskList, task: &Task) -> Result<TaskSummary> {
    Ok(TaskSummary {
        name: task.name.clone(),
        ancestors: list.breadcrumb(&task.id)?,
        tags: task.tags.clone(),
    })
}

// === fetch ===

#[derive(Debug, Serialize)]
pub struct FetchOutput {
    pub tasks: usize,
    pub goals: usize,
    pub actions: usize,
    pub completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl Output for FetchOutput {
    fn to_human(&self) -> String {
        let mut text = format!(
            "Fetched {} tasks ({} goals, {} actions, {} completed)",
            self.tasks, self.goals, self.actions, self.completed
        );
        if let Some(key) = &self.snapshot {
            let _ = write!(text, "\nSaved snapshot {}", key);
        }
        text
    }
}

pub fn fetch(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    snapshot: bool,
) -> Result<FetchOutput> {
    let task_store = TaskStore::new(config, store, cached);
    let tasks = task_store.fetch_tasks()?;
    let snapshot = if snapshot {
        Some(task_store.save_snapshot()?)
    } else {
        None
    };

    Ok(FetchOutput {
        tasks: tasks.len(),
        goals: tasks.tasks().iter().filter(|t| t.is_goal()).count(),
        actions: tasks.tasks().iter().filter(|t| t.is_action).count(),
        completed: tasks.tasks().iter().filter(|t| t.is_completed()).count(),
        snapshot,
    })
}

// === today ===

#[derive(Debug, Serialize)]
pub struct TodayOutput {
    pub date: NaiveDate,
    pub tasks: Vec<TaskSummary>,
}

impl Output for TodayOutput {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return format!("No active tasks due by {}", self.date);
        }
        let mut text = format!("Active tasks due by {}:", self.date);
        for task in &self.tasks {
            let _ = write!(text, "\n- {} [{}]", task.name.trim(), task.ancestors);
            if !task.tags.is_empty() {
                let _ = write!(text, " {}", task.tags.join(", "));
            }
        }
        text
    }
}

pub fn today(config: &Config, store: &dyn Store, cached: bool) -> Result<TodayOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    today_report(&tasks, today_local())
}

fn today_report(list: &TaskList, today: NaiveDate) -> Result<TodayOutput> {
    let mut rows = Vec::new();
    for task in list.tasks() {
        if task.is_completed() {
            continue;
        }
        let Some(due) = task.due_date else { continue };
        if due <= today {
            rows.push(summarize(list, task)?);
        }
    }
    Ok(TodayOutput { date: today, tasks: rows })
}

// === goals active ===

#[derive(Debug, Serialize)]
pub struct GoalRow {
    pub name: String,
    pub ancestors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ActiveGoalsOutput {
    /// When set, only goals due on or before this date are listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_before: Option<NaiveDate>,
    pub goals: Vec<GoalRow>,
}

impl Output for ActiveGoalsOutput {
    fn to_human(&self) -> String {
        let mut text = match self.due_before {
            Some(limit) => format!("Active goals due by {}:", limit),
            None => "Active goals:".to_string(),
        };
        if self.goals.is_empty() {
            text.push_str("\n(none)");
            return text;
        }
        for (i, goal) in self.goals.iter().enumerate() {
            let _ = write!(
                text,
                "\n{}) {}\n   Due {} • {}",
                i + 1,
                goal.name.trim(),
                format_due(goal.due_date),
                goal.ancestors
            );
        }
        text
    }
}

pub fn goals_active(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    all: bool,
) -> Result<ActiveGoalsOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    active_goals_report(&tasks, today_local(), all)
}

fn active_goals_report(list: &TaskList, today: NaiveDate, all: bool) -> Result<ActiveGoalsOutput> {
    let due_before = (!all).then(|| aggregate::next_sunday(today));

    let mut rows = Vec::new();
    for task in list.tasks() {
        if !task.is_goal() || task.is_completed() {
            continue;
        }
        if let Some(limit) = due_before {
            // Due-this-week view: undated goals are excluded
            match task.due_date {
                Some(due) if due <= limit => {}
                _ => continue,
            }
        }
        rows.push(GoalRow {
            name: task.name.clone(),
            ancestors: list.breadcrumb(&task.id)?,
            due_date: task.due_date,
            tags: task.tags.clone(),
        });
    }

    // Undated goals sort last
    rows.sort_by_key(|row| row.due_date.unwrap_or(NaiveDate::MAX));

    Ok(ActiveGoalsOutput {
        due_before,
        goals: rows,
    })
}

// === goals finished ===

#[derive(Debug, Serialize)]
pub struct FinishedWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub goals: Vec<TaskSummary>,
}

#[derive(Debug, Serialize)]
pub struct FinishedGoalsOutput {
    pub weeks: Vec<FinishedWeek>,
}

impl Output for FinishedGoalsOutput {
    fn to_human(&self) -> String {
        if self.weeks.is_empty() {
            return "No finished goals yet".to_string();
        }
        let mut text = String::from("Finished goals");
        for week in &self.weeks {
            let _ = write!(
                text,
                "\n{} - {}",
                week.start.format("%b %d"),
                week.end.format("%b %d")
            );
            for (i, goal) in week.goals.iter().enumerate() {
                let _ = write!(text, "\n  {}) {} [{}]", i + 1, goal.name.trim(), goal.ancestors);
            }
        }
        text
    }
}

pub fn goals_finished(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    recent: usize,
) -> Result<FinishedGoalsOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    finished_goals_report(&tasks, today_local(), recent)
}

fn finished_goals_report(
    list: &TaskList,
    today: NaiveDate,
    recent: usize,
) -> Result<FinishedGoalsOutput> {
    let mut opts = WeeklyOptions::new(today);
    opts.completed_only = true;
    opts.include_future = true;

    let buckets = aggregate::weekly_buckets(list, &opts);
    let mut weeks = Vec::new();
    for bucket in aggregate::goals_view(&buckets) {
        if bucket.tasks.is_empty() {
            continue;
        }
        let goals = bucket
            .tasks
            .iter()
            .map(|&task| summarize(list, task))
            .collect::<Result<Vec<_>>>()?;
        weeks.push(FinishedWeek {
            start: bucket.start,
            end: bucket.end,
            goals,
        });
    }

    if weeks.len() > recent {
        weeks.drain(..weeks.len() - recent);
    }

    Ok(FinishedGoalsOutput { weeks })
}

// === stats ===

#[derive(Debug, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub label: String,
    pub completed_actions: usize,
    pub completed_other: usize,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
pub struct DailyStatsOutput {
    pub days: Vec<DailyRow>,
}

impl Output for DailyStatsOutput {
    fn to_human(&self) -> String {
        let mut text = String::from("Task completions by day");
        for day in &self.days {
            let _ = write!(
                text,
                "\n{}  actions={} other={} pending={}",
                day.label, day.completed_actions, day.completed_other, day.pending
            );
        }
        text
    }
}

pub fn stats_daily(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    days: u32,
) -> Result<DailyStatsOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    Ok(daily_stats_report(&tasks, today_local(), days))
}

fn daily_stats_report(list: &TaskList, today: NaiveDate, days: u32) -> DailyStatsOutput {
    let days = aggregate::daily_window(list, today, days)
        .iter()
        .map(|bucket| DailyRow {
            date: bucket.key,
            label: bucket.key.format("%Y-%m-%d (%a)").to_string(),
            completed_actions: bucket.completed_actions(),
            completed_other: bucket.completed_other(),
            pending: bucket.pending(),
        })
        .collect();
    DailyStatsOutput { days }
}

#[derive(Debug, Serialize)]
pub struct WeeklyRow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
    pub story_points: i64,
}

#[derive(Debug, Serialize)]
pub struct WeeklyStatsOutput {
    pub weeks: Vec<WeeklyRow>,
}

impl Output for WeeklyStatsOutput {
    fn to_human(&self) -> String {
        let mut text = String::from("Tasks by week");
        for week in &self.weeks {
            let _ = write!(
                text,
                "\n{} - {}  count={} story_points={}",
                week.start.format("%b %d"),
                week.end.format("%b %d"),
                week.count,
                week.story_points
            );
        }
        text
    }
}

#[allow(clippy::too_many_arguments)]
pub fn stats_weekly(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    completed_only: bool,
    include_future: bool,
    recent: usize,
    goals: bool,
) -> Result<WeeklyStatsOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    Ok(weekly_stats_report(
        &tasks,
        today_local(),
        completed_only,
        include_future,
        recent,
        goals,
    ))
}

fn weekly_stats_report(
    list: &TaskList,
    today: NaiveDate,
    completed_only: bool,
    include_future: bool,
    recent: usize,
    goals: bool,
) -> WeeklyStatsOutput {
    let mut opts = WeeklyOptions::new(today);
    opts.completed_only = completed_only;
    opts.include_future = include_future;
    opts.recent = Some(recent);

    let buckets = aggregate::weekly_buckets(list, &opts);
    let buckets = if goals {
        aggregate::goals_view(&buckets)
    } else {
        buckets
    };

    let weeks = buckets
        .iter()
        .map(|bucket| WeeklyRow {
            start: bucket.start,
            end: bucket.end,
            count: bucket.count(),
            story_points: bucket.story_point_total(),
        })
        .collect();
    WeeklyStatsOutput { weeks }
}

#[derive(Debug, Serialize)]
pub struct MonthlyRow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
    pub story_points: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyStatsOutput {
    pub months: Vec<MonthlyRow>,
}

impl Output for MonthlyStatsOutput {
    fn to_human(&self) -> String {
        let mut text = String::from("Completed tasks by month");
        for month in &self.months {
            let _ = write!(
                text,
                "\n{}-{:02}  count={} story_points={}",
                month.year, month.month, month.count, month.story_points
            );
        }
        text
    }
}

pub fn stats_monthly(
    config: &Config,
    store: &dyn Store,
    cached: bool,
    goals: bool,
) -> Result<MonthlyStatsOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    Ok(monthly_stats_report(&tasks, goals))
}

fn monthly_stats_report(list: &TaskList, goals: bool) -> MonthlyStatsOutput {
    let buckets = aggregate::monthly_buckets(list);
    let buckets = if goals {
        aggregate::goals_view(&buckets)
    } else {
        buckets
    };

    let months = buckets
        .iter()
        .map(|bucket| MonthlyRow {
            year: bucket.key.0,
            month: bucket.key.1,
            start: bucket.start,
            end: bucket.end,
            count: bucket.count(),
            story_points: bucket.story_point_total(),
        })
        .collect();
    MonthlyStatsOutput { months }
}

// === export ===

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ExportOutput {
    pub rows: Vec<TaskRow>,
}

impl Output for ExportOutput {
    fn to_human(&self) -> String {
        let mut text = format!("{} task rows", self.rows.len());
        for row in &self.rows {
            let _ = write!(text, "\n{}  {}", row.id, row.name.trim());
        }
        text
    }
}

pub fn export(config: &Config, store: &dyn Store, cached: bool) -> Result<ExportOutput> {
    let tasks = TaskStore::new(config, store, cached).fetch_tasks()?;
    Ok(ExportOutput {
        rows: tasks.export_rows()?,
    })
}

// === delta ===

#[derive(Debug, Serialize)]
pub struct DeltaOutput {
    /// Snapshot key the comparison ran against; absent when no snapshot
    /// has ever been saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub added: usize,
    pub removed: usize,
    pub newly_completed: Vec<String>,
}

impl Output for DeltaOutput {
    fn to_human(&self) -> String {
        let Some(since) = &self.since else {
            return "No snapshot history yet; run `ptm snapshot save` first".to_string();
        };
        let mut text = format!(
            "Since {}: {} added, {} removed, {} newly completed",
            since,
            self.added,
            self.removed,
            self.newly_completed.len()
        );
        for name in &self.newly_completed {
            let _ = write!(text, "\n- {}", name.trim());
        }
        text
    }
}

pub fn delta(config: &Config, store: &dyn Store, cached: bool) -> Result<DeltaOutput> {
    let task_store = TaskStore::new(config, store, cached);
    let current = task_store.fetch_tasks()?;

    let Some((key, historical)) = task_store.historical_tasks()? else {
        return Ok(DeltaOutput {
            since: None,
            added: 0,
            removed: 0,
            newly_completed: Vec::new(),
        });
    };

    let delta = aggregate::collection_delta(&current, &historical);
    Ok(DeltaOutput {
        since: Some(key),
        added: delta.added.len(),
        removed: delta.removed.len(),
        newly_completed: delta
            .newly_completed
            .iter()
            .map(|task| task.name.clone())
            .collect(),
    })
}

// === snapshot ===

#[derive(Debug, Serialize)]
pub struct SnapshotSaveOutput {
    pub key: String,
}

impl Output for SnapshotSaveOutput {
    fn to_human(&self) -> String {
        format!("Saved snapshot {}", self.key)
    }
}

pub fn snapshot_save(
    config: &Config,
    store: &dyn Store,
    cached: bool,
) -> Result<SnapshotSaveOutput> {
    let key = TaskStore::new(config, store, cached).save_snapshot()?;
    Ok(SnapshotSaveOutput { key })
}

#[derive(Debug, Serialize)]
pub struct SnapshotListOutput {
    pub snapshots: Vec<String>,
}

impl Output for SnapshotListOutput {
    fn to_human(&self) -> String {
        if self.snapshots.is_empty() {
            return "No snapshots saved".to_string();
        }
        self.snapshots.join("\n")
    }
}

pub fn snapshot_list(store: &dyn Store) -> Result<SnapshotListOutput> {
    Ok(SnapshotListOutput {
        snapshots: store.list_snapshots()?,
    })
}

// === config ===

#[derive(Debug, Serialize)]
pub struct ConfigPathOutput {
    pub path: String,
    pub exists: bool,
}

impl Output for ConfigPathOutput {
    fn to_human(&self) -> String {
        format!(
            "{}{}",
            self.path,
            if self.exists { "" } else { " (not present)" }
        )
    }
}

pub fn config_path(explicit: Option<&Path>) -> ConfigPathOutput {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(Config::default_path)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    ConfigPathOutput {
        exists: path.exists(),
        path: path.display().to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub base_url: String,
    pub session_cookie_configured: bool,
    pub data_dir: String,
}

impl Output for ConfigShowOutput {
    fn to_human(&self) -> String {
        format!(
            "base_url: {}\nsession_cookie: {}\ndata_dir: {}",
            self.base_url,
            if self.session_cookie_configured {
                "(configured)"
            } else {
                "(not set)"
            },
            self.data_dir
        )
    }
}

pub fn config_show(config: &Config, data_dir: &Path) -> ConfigShowOutput {
    ConfigShowOutput {
        base_url: config.api.base_url.clone(),
        session_cookie_configured: config.session_cookie().is_some(),
        data_dir: data_dir.display().to_string(),
    }
}
