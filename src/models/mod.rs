//! Data models for ptm entities.
//!
//! This module defines the core data structures:
//! - `Task` - One normalized outline item: hierarchy pointer, derived
//!   dates, tags, classification flags, story points
//! - `GoalTimeframe` - Which goal horizon a task belongs to
//! - `TaskList` - The task collection with id lookup and ancestor chains
//! - `TaskRow` - The flattened per-task shape consumed by downstream
//!   table exports

pub mod markup;

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::workflowy::{RawNode, TreeData};
use crate::{Error, Result};

/// Sentinel parent value the tree endpoint uses for root items.
const NO_PARENT: &str = "None";

const ACTION_TAG: &str = "#Action";
const WEEK_GOAL_TAG: &str = "#WeekGoal";
const MONTH_GOAL_TAG: &str = "#MonthGoal";
const QUARTER_GOAL_TAG: &str = "#QuarterGoal";
const ANNUAL_GOAL_TAG: &str = "#AnnualGoal";
const MILESTONE_TAG: &str = "#Milestone";
const ONDECK_TAG: &str = "#OnDeck";

/// Goal horizon, derived from the per-timeframe goal tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTimeframe {
    Week,
    Month,
    Quarter,
    Annual,
}

/// One outline item, normalized. Immutable once constructed: every field
/// is derived from the raw node at parse time, and a new fetch produces a
/// whole new collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, stable across fetches, from the source service
    pub id: String,

    /// Parent item id; `None` for roots
    pub parent_id: Option<String>,

    /// Display text with markup, hashtags, and the due annotation removed
    pub name: String,

    /// Embedded due date, no time-of-day component
    pub due_date: Option<NaiveDate>,

    /// Hashtags as they appeared, in order, duplicates preserved
    pub tags: Vec<String>,

    /// Completion instant: account-join epoch plus the node's offset.
    /// Present iff the raw node carried the completion offset.
    pub completion_date: Option<DateTime<Utc>>,

    /// Tag classification flags
    pub is_action: bool,
    pub is_week_goal: bool,
    pub is_month_goal: bool,
    pub is_quarter_goal: bool,
    pub is_annual_goal: bool,
    pub is_milestone: bool,
    pub is_ondeck: bool,

    /// Estimate from a `#<digits>STP` tag; the last such tag wins
    pub story_points: Option<i64>,
}

impl Task {
    /// Normalize one raw tree node.
    ///
    /// `date_joined_epoch` is the account-join timestamp in seconds; the
    /// node's completion offset is relative to it. A node without a name
    /// field violates the input contract and fails the whole parse; every
    /// other absence degrades to `None`.
    pub fn from_raw(raw: &RawNode, date_joined_epoch: i64) -> Result<Task> {
        let raw_name = raw
            .name
            .as_deref()
            .ok_or_else(|| Error::MalformedNode(format!("item {} has no name field", raw.id)))?;

        let tags = markup::extract_tags(raw_name);
        let completion_date = raw
            .completed_offset
            .and_then(|offset| DateTime::from_timestamp(date_joined_epoch + offset, 0));

        let has = |tag: &str| tags.iter().any(|t| t == tag);

        let mut story_points = None;
        for tag in &tags {
            if let Some(points) = parse_story_points(tag) {
                story_points = Some(points);
            }
        }

        Ok(Task {
            id: raw.id.clone(),
            parent_id: (raw.parent != NO_PARENT).then(|| raw.parent.clone()),
            name: markup::clean_name(raw_name),
            due_date: markup::extract_due_date(raw_name),
            completion_date,
            is_action: has(ACTION_TAG),
            is_week_goal: has(WEEK_GOAL_TAG),
            is_month_goal: has(MONTH_GOAL_TAG),
            is_quarter_goal: has(QUARTER_GOAL_TAG),
            is_annual_goal: has(ANNUAL_GOAL_TAG),
            is_milestone: has(MILESTONE_TAG),
            is_ondeck: has(ONDECK_TAG),
            story_points,
            tags,
        })
    }

    /// A task counts as a goal when it carries any timeframe goal tag.
    pub fn is_goal(&self) -> bool {
        self.is_week_goal || self.is_month_goal || self.is_quarter_goal || self.is_annual_goal
    }

    /// The goal horizon; when several timeframe tags are present the
    /// shortest horizon wins.
    pub fn goal_timeframe(&self) -> Option<GoalTimeframe> {
        if self.is_week_goal {
            Some(GoalTimeframe::Week)
        } else if self.is_month_goal {
            Some(GoalTimeframe::Month)
        } else if self.is_quarter_goal {
            Some(GoalTimeframe::Quarter)
        } else if self.is_annual_goal {
            Some(GoalTimeframe::Annual)
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }
}

/// Parse a `#<digits>STP` story-point tag. Tags ending in `STP` without a
/// pure digit run do not match.
fn parse_story_points(tag: &str) -> Option<i64> {
    let digits = tag.strip_prefix('#')?.strip_suffix("STP")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// The flattened per-task shape written to downstream tables.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    /// Ancestor names, immediate parent first, `" < "` separated
    pub ancestors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    pub is_action: bool,
    pub is_goal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_timeframe: Option<GoalTimeframe>,
    pub is_milestone: bool,
    pub is_ondeck: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_points: Option<i64>,
}

/// The normalized task collection for one fetch/parse cycle.
///
/// Owns the tasks in source order and an id index built at most once.
/// Read-only after construction; a new fetch builds a new collection.
#[derive(Debug)]
pub struct TaskList {
    tasks: Vec<Task>,
    index: OnceLock<HashMap<String, usize>>,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            index: OnceLock::new(),
        }
    }

    /// Normalize a whole tree response. Fails on the first node that
    /// violates the input contract.
    pub fn from_tree(tree: &TreeData, date_joined_epoch: i64) -> Result<Self> {
        let tasks = tree
            .items
            .iter()
            .map(|raw| Task::from_raw(raw, date_joined_epoch))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(tasks))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index().get(id).map(|&pos| &self.tasks[pos])
    }

    /// The id index, built on first use. `OnceLock` makes the build
    /// idempotent; an empty collection yields an empty-but-built map.
    fn index(&self) -> &HashMap<String, usize> {
        self.index.get_or_init(|| {
            self.tasks
                .iter()
                .enumerate()
                .map(|(pos, task)| (task.id.clone(), pos))
                .collect()
        })
    }

    /// Ancestor chain for a task, root first, immediate parent last.
    /// A root task has no ancestors. Any id missing from the collection
    /// (the task itself, or a dangling parent pointer anywhere up the
    /// chain) is a `NotFound` error.
    pub fn ancestors(&self, task_id: &str) -> Result<Vec<&Task>> {
        let task = self
            .get(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;

        let mut chain = Vec::new();
        let mut parent_id = task.parent_id.as_deref();
        while let Some(id) = parent_id {
            let parent = self.get(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
            chain.push(parent);
            parent_id = parent.parent_id.as_deref();
        }

        chain.reverse();
        Ok(chain)
    }

    /// Display breadcrumb for a task: ancestor names root-first, joined
    /// with `" > "`.
    pub fn breadcrumb(&self, task_id: &str) -> Result<String> {
        let names: Vec<&str> = self
            .ancestors(task_id)?
            .iter()
            .map(|task| task.name.as_str())
            .collect();
        Ok(names.join(" > "))
    }

    /// Flatten every task into the relational export shape.
    pub fn export_rows(&self) -> Result<Vec<TaskRow>> {
        self.tasks
            .iter()
            .map(|task| {
                let chain = self.ancestors(&task.id)?;
                let ancestors: Vec<&str> =
                    chain.iter().rev().map(|a| a.name.as_str()).collect();
                Ok(TaskRow {
                    id: task.id.clone(),
                    parent_id: task.parent_id.clone(),
                    name: task.name.clone(),
                    ancestors: ancestors.join(" < "),
                    due_date: task.due_date,
                    tags: task.tags.clone(),
                    completion_date: task.completion_date,
                    is_action: task.is_action,
                    is_goal: task.is_goal(),
                    goal_timeframe: task.goal_timeframe(),
                    is_milestone: task.is_milestone,
                    is_ondeck: task.is_ondeck,
                    story_points: task.story_points,
                })
            })
            .collect()
    }
}
