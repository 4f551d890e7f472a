use tracing::trace;

use crate::task::{
  Status,
  Task
};

/// Case-insensitive title search. An
/// empty term matches every task.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
  needle: String
}

impl SearchFilter {
  pub fn new(term: &str) -> Self {
    Self {
      needle: term.to_lowercase()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.needle.is_empty()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.needle.is_empty()
      || task.matches_title(&self.needle)
  }
}

/// One status bucket, in insertion
/// order.
#[derive(Debug, Clone)]
pub struct Column<'a> {
  pub status: Status,
  pub tasks:  Vec<&'a Task>
}

impl<'a> Column<'a> {
  fn new(status: Status) -> Self {
    Self {
      status,
      tasks: Vec::new()
    }
  }

  pub fn label(&self) -> &'static str {
    self.status.label()
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  /// Drives the column's empty-state
  /// display.
  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn titles(
    &self
  ) -> Vec<&'a str> {
    self
      .tasks
      .iter()
      .map(|t| t.title.as_str())
      .collect()
  }
}

#[derive(Debug, Clone)]
pub struct Board<'a> {
  pub not_started: Column<'a>,
  pub in_progress: Column<'a>,
  pub completed:   Column<'a>
}

impl<'a> Board<'a> {
  pub fn column(
    &self,
    status: Status
  ) -> &Column<'a> {
    match status {
      | Status::NotStarted => {
        &self.not_started
      }
      | Status::InProgress => {
        &self.in_progress
      }
      | Status::Completed => {
        &self.completed
      }
    }
  }

  fn column_mut(
    &mut self,
    status: Status
  ) -> &mut Column<'a> {
    match status {
      | Status::NotStarted => {
        &mut self.not_started
      }
      | Status::InProgress => {
        &mut self.in_progress
      }
      | Status::Completed => {
        &mut self.completed
      }
    }
  }

  /// Columns in display order.
  pub fn columns(
    &self
  ) -> [&Column<'a>; 3] {
    [
      &self.not_started,
      &self.in_progress,
      &self.completed
    ]
  }

  pub fn visible_count(&self) -> usize {
    self
      .columns()
      .iter()
      .map(|c| c.len())
      .sum()
  }
}

#[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
pub fn partition<'a>(
  tasks: &'a [Task],
  search: &str
) -> Board<'a> {
  let filter = SearchFilter::new(search);
  let mut board = Board {
    not_started: Column::new(
      Status::NotStarted
    ),
    in_progress: Column::new(
      Status::InProgress
    ),
    completed:   Column::new(
      Status::Completed
    )
  };

  for task in tasks {
    if filter.matches(task) {
      board
        .column_mut(task.status)
        .tasks
        .push(task);
    }
  }

  trace!(
    visible = board.visible_count(),
    "partitioned tasks"
  );
  board
}
