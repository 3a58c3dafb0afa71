use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::anyhow;
use clap::ValueEnum;
use tracing::trace;

use crate::task::{
  Priority,
  Status,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct StatusCounts {
  pub total:       usize,
  pub pending:     usize,
  pub in_progress: usize,
  pub completed:   usize
}

impl StatusCounts {
  pub fn get(
    &self,
    status: Status
  ) -> usize {
    match status {
      | Status::Pending => self.pending,
      | Status::InProgress => {
        self.in_progress
      }
      | Status::Completed => {
        self.completed
      }
    }
  }
}

pub fn status_counts(
  tasks: &[Task]
) -> StatusCounts {
  let mut counts =
    StatusCounts {
      total: tasks.len(),
      ..StatusCounts::default()
    };
  for task in tasks {
    match task.status {
      | Status::Pending => {
        counts.pending += 1
      }
      | Status::InProgress => {
        counts.in_progress += 1
      }
      | Status::Completed => {
        counts.completed += 1
      }
    }
  }
  counts
}

/// High priority work that is not
/// finished yet.
pub fn priority_tasks(
  tasks: &[Task]
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|t| {
      t.priority == Priority::High
        && t.status != Status::Completed
    })
    .collect()
}

pub fn completed_tasks(
  tasks: &[Task]
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|t| {
      t.status == Status::Completed
    })
    .collect()
}

/// Distinct categories in the order
/// they first appear.
pub fn categories(
  tasks: &[Task]
) -> Vec<&str> {
  let mut seen = BTreeSet::new();
  tasks
    .iter()
    .map(|t| t.category.as_str())
    .filter(|c| seen.insert(*c))
    .collect()
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum StatusFilter {
  All,
  Only(Status)
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.eq_ignore_ascii_case("all") {
      return Ok(Self::All);
    }
    Status::from_str(s, true)
      .map(Self::Only)
      .map_err(|_| {
        anyhow!(
          "unknown status filter: {s} \
           (expected all, pending, \
           in_progress or completed)"
        )
      })
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum CategoryFilter {
  All,
  Only(String)
}

impl FromStr for CategoryFilter {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.eq_ignore_ascii_case("all") {
      Ok(Self::All)
    } else {
      Ok(Self::Only(s.to_string()))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  ValueEnum,
)]
pub enum SortKey {
  #[default]
  #[value(alias = "dueDate")]
  DueDate,
  Priority
}

#[derive(Debug, Clone)]
pub struct TaskQuery {
  pub status:   StatusFilter,
  pub category: CategoryFilter,
  pub sort:     SortKey
}

impl Default for TaskQuery {
  fn default() -> Self {
    Self {
      status:   StatusFilter::All,
      category: CategoryFilter::All,
      sort:     SortKey::DueDate
    }
  }
}

impl TaskQuery {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let status_ok = match self.status {
      | StatusFilter::All => true,
      | StatusFilter::Only(s) => {
        task.status == s
      }
    };
    let category_ok =
      match &self.category {
        | CategoryFilter::All => true,
        | CategoryFilter::Only(c) => {
          &task.category == c
        }
      };
    status_ok && category_ok
  }

  /// Filters, then sorts stably so
  /// equal keys keep insertion order.
  #[tracing::instrument(skip(
    self, tasks
  ))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = tasks
      .iter()
      .filter(|t| self.matches(t))
      .collect();

    match self.sort {
      | SortKey::DueDate => {
        // Undated or unparseable
        // tasks go last.
        out.sort_by_key(|t| {
          let due = t.due();
          (due.is_none(), due)
        })
      }
      | SortKey::Priority => {
        out.sort_by_key(|t| {
          t.priority.rank()
        })
      }
    }

    trace!(
      matched = out.len(),
      total = tasks.len(),
      "applied task query"
    );
    out
  }
}
