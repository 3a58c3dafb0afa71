//! In-memory task collection: tasks, comments and subtasks in insertion order.
//!
//! Every operation is total. Operations addressed by id that find nothing
//! leave the collection untouched and report that through their return
//! value. Deleting a task does not touch its comments or subtasks.

use tracing::{debug, trace};

use crate::task::{Comment, Status, Subtask, Task};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
    pub subtasks: Vec<Subtask>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>, comments: Vec<Comment>, subtasks: Vec<Subtask>) -> Self {
        Self {
            tasks,
            comments,
            subtasks,
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        debug!(count = tasks.len(), "replacing task list");
        self.tasks = tasks;
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
        debug!(count = self.tasks.len(), "task added");
    }

    /// Replaces the task with the same id.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn update_task(&mut self, task: Task) -> bool {
        match self.tasks.iter().position(|t| t.id == task.id) {
            Some(idx) => {
                self.tasks[idx] = task;
                true
            }
            None => {
                trace!("update ignored: no such task");
                false
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        debug!(removed, "delete task");
        removed
    }

    /// Sets only `status`; `completed` and `updated_at` are left as they were.
    #[tracing::instrument(skip(self))]
    pub fn update_task_status(&mut self, id: &str, status: Status) -> bool {
        match self.task_mut(id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    pub fn comments_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Comment> + 'a {
        self.comments.iter().filter(move |c| c.task_id == task_id)
    }

    #[tracing::instrument(skip(self, comment), fields(id = %comment.id, task = %comment.task_id))]
    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_comment(&mut self, id: &str) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != id);
        self.comments.len() != before
    }

    pub fn subtasks_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Subtask> + 'a {
        self.subtasks.iter().filter(move |s| s.task_id == task_id)
    }

    #[tracing::instrument(skip(self, subtask), fields(id = %subtask.id, task = %subtask.task_id))]
    pub fn add_subtask(&mut self, subtask: Subtask) {
        self.subtasks.push(subtask);
    }

    #[tracing::instrument(skip(self, subtask), fields(id = %subtask.id))]
    pub fn update_subtask(&mut self, subtask: Subtask) -> bool {
        match self.subtasks.iter().position(|s| s.id == subtask.id) {
            Some(idx) => {
                self.subtasks[idx] = subtask;
                true
            }
            None => false,
        }
    }

    pub fn toggle_subtask(&mut self, id: &str, completed: bool) -> bool {
        let Some(existing) = self.subtasks.iter().find(|s| s.id == id) else {
            return false;
        };
        let updated = Subtask {
            completed,
            ..existing.clone()
        };
        self.update_subtask(updated)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_subtask(&mut self, id: &str) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.id != id);
        self.subtasks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::task::TaskDraft;

    fn task(id: &str, title: &str) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let draft = TaskDraft {
            title: title.to_string(),
            ..TaskDraft::default()
        };
        Task::from_draft(id.to_string(), draft, now)
    }

    fn comment(id: &str, task_id: &str) -> Comment {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        Comment::new(id.to_string(), task_id, "note", "Ada", now)
    }

    #[test]
    fn add_keeps_insertion_order() {
        let mut store = TaskStore::default();
        store.add_task(task("2", "second"));
        store.add_task(task("1", "first"));
        let ids: Vec<_> = store.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn update_replaces_in_place_or_does_nothing() {
        let mut store = TaskStore::default();
        store.add_task(task("1", "a"));
        store.add_task(task("2", "b"));

        assert!(store.update_task(task("1", "renamed")));
        assert_eq!(store.tasks[0].title, "renamed");

        let snapshot = store.clone();
        assert!(!store.update_task(task("9", "ghost")));
        assert_eq!(store, snapshot);
    }

    #[test]
    fn status_update_leaves_completed_flag_alone() {
        let mut store = TaskStore::default();
        store.add_task(task("1", "a"));

        assert!(store.update_task_status("1", Status::Completed));
        let t = store.task("1").unwrap();
        assert_eq!(t.status, Status::Completed);
        assert!(!t.completed);

        assert!(!store.update_task_status("404", Status::Completed));
    }

    #[test]
    fn deleting_a_task_keeps_its_comments_and_subtasks() {
        let mut store = TaskStore::default();
        store.add_task(task("1", "a"));
        store.add_task(task("2", "b"));
        store.add_comment(comment("c1", "1"));
        store.add_comment(comment("c2", "2"));
        store.add_subtask(Subtask::new("s1".to_string(), "1", "step"));

        assert!(store.delete_task("1"));
        assert!(store.task("1").is_none());
        assert_eq!(store.tasks.len(), 1);
        assert_eq!(store.comments.len(), 2);
        assert_eq!(store.comments_for("1").count(), 1);
        assert_eq!(store.subtasks_for("1").count(), 1);

        assert!(!store.delete_task("1"));
    }

    #[test]
    fn subtask_toggle_and_delete() {
        let mut store = TaskStore::default();
        store.add_subtask(Subtask::new("s1".to_string(), "1", "step one"));
        store.add_subtask(Subtask::new("s2".to_string(), "1", "step two"));

        assert!(store.toggle_subtask("s2", true));
        assert!(store.subtasks[1].completed);
        assert!(!store.subtasks[0].completed);
        assert!(!store.toggle_subtask("nope", true));

        assert!(store.delete_subtask("s1"));
        assert_eq!(store.subtasks_for("1").count(), 1);
    }

    #[test]
    fn set_tasks_replaces_the_whole_list() {
        let mut store = TaskStore::default();
        store.add_task(task("1", "old"));
        store.set_tasks(vec![task("7", "new"), task("8", "newer")]);
        assert!(store.task("1").is_none());
        assert_eq!(store.tasks.len(), 2);
    }

    #[test]
    fn comment_delete_by_id() {
        let mut store = TaskStore::default();
        store.add_comment(comment("c1", "1"));
        assert!(store.delete_comment("c1"));
        assert!(!store.delete_comment("c1"));
        assert!(store.comments.is_empty());
    }
}
