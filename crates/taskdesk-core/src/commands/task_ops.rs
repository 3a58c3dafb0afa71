use anyhow::anyhow;
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::ValueEnum;
use tracing::{debug, info, instrument, warn};

use super::{form_rejected, require_login};
use crate::cli::{CommentCommand, EditTaskArgs, ListArgs, NewTaskArgs, SubtaskCommand, TaskCommand};
use crate::config::Config;
use crate::render::Renderer;
use crate::state::AppState;
use crate::storage::LocalStorage;
use crate::task::{CATEGORIES, Comment, Subtask, Task, TaskDraft, new_id};
use crate::validation::{validate_edit_task, validate_new_task};
use crate::views::{self, SortKey, TaskQuery};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn no_such_task(id: &str) -> anyhow::Error {
    anyhow!("no task with id {id}")
}

#[instrument(skip(state, storage, cfg, renderer, cmd, now))]
pub(super) fn cmd_task(
    state: &mut AppState,
    storage: &LocalStorage,
    cfg: &Config,
    renderer: &mut Renderer,
    cmd: TaskCommand,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match cmd {
        TaskCommand::Add(args) => cmd_add(state, storage, renderer, args, now),
        TaskCommand::Edit(args) => cmd_edit(state, storage, renderer, args, now),
        TaskCommand::List(args) => cmd_list(state, cfg, renderer, args),
        TaskCommand::Show { id } => cmd_show(state, renderer, &id),
        TaskCommand::Status { id, status } => {
            if !state.tasks.update_task_status(&id, status) {
                return Err(no_such_task(&id));
            }
            state.save_tasks(storage)?;
            renderer.message(&format!("Task {id} is now {}.", status.label()))
        }
        TaskCommand::Delete { id } => {
            if !state.tasks.delete_task(&id) {
                return Err(no_such_task(&id));
            }
            state.save_tasks(storage)?;
            info!(%id, "task deleted");
            renderer.message(&format!("Deleted task {id}."))
        }
        TaskCommand::Tag { id, tag } => {
            let task = state.tasks.task_mut(&id).ok_or_else(|| no_such_task(&id))?;
            if !task.add_tag(&tag) {
                return renderer.message(&format!("Task {id} already has tag '{}'.", tag.trim()));
            }
            task.updated_at = now;
            state.save_tasks(storage)?;
            renderer.message(&format!("Tagged task {id} with '{}'.", tag.trim()))
        }
        TaskCommand::Untag { id, tag } => {
            let task = state.tasks.task_mut(&id).ok_or_else(|| no_such_task(&id))?;
            if !task.remove_tag(&tag) {
                return renderer.message(&format!("Task {id} has no tag '{}'.", tag.trim()));
            }
            task.updated_at = now;
            state.save_tasks(storage)?;
            renderer.message(&format!("Removed tag '{}' from task {id}.", tag.trim()))
        }
    }
}

#[instrument(skip(state, storage, renderer, args, now))]
fn cmd_add(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    args: NewTaskArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let draft = TaskDraft {
        title: args.title.unwrap_or_default(),
        description: args.description,
        due_date: args.due,
        priority: args.priority,
        category: args.category,
        tags: args.tags,
        ..TaskDraft::default()
    };
    validate_new_task(&draft).map_err(|errors| form_rejected(errors, "task add"))?;
    if !CATEGORIES.contains(&draft.category.as_str()) {
        debug!(category = %draft.category, "category outside the standard set");
    }

    let task = Task::from_draft(new_id(now), draft, now);
    let id = task.id.clone();
    state.tasks.add_task(task);
    state.save_tasks(storage)?;

    debug!(tasks = state.tasks.tasks.len(), "task added");
    renderer.message(&format!("Created task {id}."))
}

#[instrument(skip(state, storage, renderer, args, now), fields(id = %args.id))]
fn cmd_edit(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    args: EditTaskArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let existing = state
        .tasks
        .task(&args.id)
        .ok_or_else(|| no_such_task(&args.id))?;

    let mut draft = TaskDraft::from_task(existing);
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(description) = args.description {
        draft.description = description;
    }
    if let Some(due) = args.due {
        draft.due_date = due;
    }
    if let Some(priority) = args.priority {
        draft.priority = priority;
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if let Some(status) = args.status {
        draft.status = status;
    }
    validate_edit_task(&draft).map_err(|errors| form_rejected(errors, "task edit"))?;

    let mut task = Task {
        title: draft.title,
        description: draft.description,
        due_date: draft.due_date.trim().to_string(),
        priority: draft.priority,
        category: draft.category,
        status: draft.status,
        updated_at: now,
        ..existing.clone()
    };
    for tag in &args.add_tags {
        task.add_tag(tag);
    }
    for tag in &args.remove_tags {
        task.remove_tag(tag);
    }

    state.tasks.update_task(task);
    state.save_tasks(storage)?;
    renderer.message(&format!("Updated task {}.", args.id))
}

fn cmd_list(
    state: &AppState,
    cfg: &Config,
    renderer: &mut Renderer,
    args: ListArgs,
) -> anyhow::Result<()> {
    let sort = match args.sort {
        Some(sort) => sort,
        None => configured_sort(cfg),
    };
    let query = TaskQuery {
        status: args.status,
        category: args.category,
        sort,
    };
    debug!(?query, "listing tasks");

    let tasks = query.apply(&state.tasks.tasks);
    renderer.print_task_table(&tasks, today())
}

fn configured_sort(cfg: &Config) -> SortKey {
    let Some(raw) = cfg.get("list.sort") else {
        return SortKey::default();
    };
    SortKey::from_str(&raw, true).unwrap_or_else(|_| {
        warn!(value = %raw, "unknown list.sort value; sorting by due date");
        SortKey::default()
    })
}

fn cmd_show(state: &AppState, renderer: &mut Renderer, id: &str) -> anyhow::Result<()> {
    let task = state.tasks.task(id).ok_or_else(|| no_such_task(id))?;
    let comments: Vec<_> = state.tasks.comments_for(id).collect();
    let subtasks: Vec<_> = state.tasks.subtasks_for(id).collect();
    renderer.print_task_detail(task, &comments, &subtasks)
}

#[instrument(skip(state, renderer))]
pub(super) fn cmd_dashboard(state: &AppState, renderer: &mut Renderer) -> anyhow::Result<()> {
    let user = require_login(state)?;
    let tasks = &state.tasks.tasks;
    renderer.print_dashboard(
        user,
        views::status_counts(tasks),
        &views::priority_tasks(tasks),
        &views::completed_tasks(tasks),
        today(),
    )
}

pub(super) fn cmd_categories(state: &AppState, renderer: &mut Renderer) -> anyhow::Result<()> {
    renderer.print_categories(&views::categories(&state.tasks.tasks))
}

#[instrument(skip(state, storage, renderer, cmd, now))]
pub(super) fn cmd_comment(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    cmd: CommentCommand,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match cmd {
        CommentCommand::Add { task_id, text } => {
            if state.tasks.task(&task_id).is_none() {
                return Err(no_such_task(&task_id));
            }
            let text = text.trim();
            if text.is_empty() {
                return Err(anyhow!("comment text cannot be empty"));
            }

            let author = require_login(state)?.name.clone();
            let comment = Comment::new(new_id(now), &task_id, text, &author, now);
            let id = comment.id.clone();
            state.tasks.add_comment(comment);
            state.save_tasks(storage)?;
            renderer.message(&format!("Added comment {id} to task {task_id}."))
        }
        CommentCommand::Delete { id } => {
            if !state.tasks.delete_comment(&id) {
                return Err(anyhow!("no comment with id {id}"));
            }
            state.save_tasks(storage)?;
            renderer.message(&format!("Deleted comment {id}."))
        }
    }
}

#[instrument(skip(state, storage, renderer, cmd, now))]
pub(super) fn cmd_subtask(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    cmd: SubtaskCommand,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let line = match cmd {
        SubtaskCommand::Add { task_id, title } => {
            if state.tasks.task(&task_id).is_none() {
                return Err(no_such_task(&task_id));
            }
            let title = title.trim();
            if title.is_empty() {
                return Err(anyhow!("subtask title cannot be empty"));
            }

            let subtask = Subtask::new(new_id(now), &task_id, title);
            let line = format!("Added subtask {} to task {task_id}.", subtask.id);
            state.tasks.add_subtask(subtask);
            line
        }
        SubtaskCommand::Done { id } => {
            set_subtask(state, &id, true)?;
            format!("Subtask {id} done.")
        }
        SubtaskCommand::Undone { id } => {
            set_subtask(state, &id, false)?;
            format!("Subtask {id} reopened.")
        }
        SubtaskCommand::Delete { id } => {
            if !state.tasks.delete_subtask(&id) {
                return Err(anyhow!("no subtask with id {id}"));
            }
            format!("Deleted subtask {id}.")
        }
    };

    state.save_tasks(storage)?;
    renderer.message(&line)
}

fn set_subtask(state: &mut AppState, id: &str, completed: bool) -> anyhow::Result<()> {
    if state.tasks.toggle_subtask(id, completed) {
        Ok(())
    } else {
        Err(anyhow!("no subtask with id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::render::tests::SharedBuf;
    use crate::settings::Theme;
    use crate::task::{Priority, Status};
    use crate::validation::{Field, FieldErrors};
    use crate::views::{CategoryFilter, StatusFilter};

    struct Fixture {
        _temp: tempfile::TempDir,
        storage: LocalStorage,
        state: AppState,
        cfg: Config,
        buf: SharedBuf,
        renderer: Renderer,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(temp.path()).unwrap();
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "off".to_string())]);
        let buf = SharedBuf::default();
        let renderer = Renderer::with_writer(&cfg, Theme::Light, buf.clone()).unwrap();
        Fixture {
            _temp: temp,
            storage,
            state: AppState::default(),
            cfg,
            buf,
            renderer,
        }
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, secs).unwrap()
    }

    fn add(f: &mut Fixture, title: &str, due: &str, priority: Priority, now: DateTime<Utc>) {
        let args = NewTaskArgs {
            title: Some(title.to_string()),
            description: String::new(),
            due: due.to_string(),
            priority,
            category: "Work".to_string(),
            tags: vec![],
        };
        cmd_add(&mut f.state, &f.storage, &mut f.renderer, args, now).unwrap();
    }

    #[test]
    fn add_without_title_is_a_title_error_and_stores_nothing() {
        let mut f = fixture();
        let args = NewTaskArgs {
            title: None,
            description: String::new(),
            due: String::new(),
            priority: Priority::Medium,
            category: "Work".to_string(),
            tags: vec![],
        };

        let err = cmd_add(&mut f.state, &f.storage, &mut f.renderer, args, at(0)).unwrap_err();

        let errors = err.downcast_ref::<FieldErrors>().unwrap();
        assert_eq!(errors.get(Field::Title), Some("Title is required"));
        assert!(f.state.tasks.tasks.is_empty());
        assert!(f.storage.get_item("tasks").unwrap().is_none());
    }

    #[test]
    fn edit_keeps_created_at_and_bumps_updated_at() {
        let mut f = fixture();
        add(&mut f, "draft", "2026-06-10", Priority::Low, at(0));
        let id = new_id(at(0));

        let args = EditTaskArgs {
            id: id.clone(),
            title: Some("final".to_string()),
            description: None,
            due: None,
            priority: Some(Priority::High),
            category: None,
            status: Some(Status::InProgress),
            add_tags: vec!["q2".to_string()],
            remove_tags: vec![],
        };
        cmd_edit(&mut f.state, &f.storage, &mut f.renderer, args, at(30)).unwrap();

        let task = f.state.tasks.task(&id).unwrap();
        assert_eq!(task.title, "final");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.tags, vec!["q2".to_string()]);
        assert_eq!(task.created_at, at(0));
        assert_eq!(task.updated_at, at(30));
    }

    #[test]
    fn edit_requires_a_due_date() {
        let mut f = fixture();
        add(&mut f, "undated", "", Priority::Low, at(0));

        let args = EditTaskArgs {
            id: new_id(at(0)),
            title: None,
            description: None,
            due: None,
            priority: None,
            category: None,
            status: None,
            add_tags: vec![],
            remove_tags: vec![],
        };
        let err = cmd_edit(&mut f.state, &f.storage, &mut f.renderer, args, at(1)).unwrap_err();
        let errors = err.downcast_ref::<FieldErrors>().unwrap();
        assert_eq!(errors.get(Field::DueDate), Some("Due date is required"));
    }

    #[test]
    fn list_uses_configured_sort() {
        let mut f = fixture();
        add(&mut f, "low", "2026-06-02", Priority::Low, at(1));
        add(&mut f, "high", "2026-06-09", Priority::High, at(2));
        f.cfg
            .apply_overrides(vec![("list.sort".to_string(), "priority".to_string())]);

        let args = ListArgs {
            status: StatusFilter::All,
            category: CategoryFilter::All,
            sort: None,
        };
        cmd_list(&f.state, &f.cfg, &mut f.renderer, args).unwrap();

        let text = f.buf.contents();
        let high = text.find("high").unwrap();
        let low = text.find("low").unwrap();
        assert!(high < low);
    }

    #[test]
    fn subtask_lifecycle_is_persisted() {
        let mut f = fixture();
        add(&mut f, "move house", "", Priority::Medium, at(0));
        let task_id = new_id(at(0));

        cmd_subtask(
            &mut f.state,
            &f.storage,
            &mut f.renderer,
            SubtaskCommand::Add {
                task_id: task_id.clone(),
                title: "pack books".to_string(),
            },
            at(5),
        )
        .unwrap();
        let sub_id = new_id(at(5));
        cmd_subtask(
            &mut f.state,
            &f.storage,
            &mut f.renderer,
            SubtaskCommand::Done { id: sub_id.clone() },
            at(6),
        )
        .unwrap();

        let reloaded = AppState::load(&f.storage).unwrap();
        let subtasks: Vec<_> = reloaded.tasks.subtasks_for(&task_id).collect();
        assert_eq!(subtasks.len(), 1);
        assert!(subtasks[0].completed);

        let err = cmd_subtask(
            &mut f.state,
            &f.storage,
            &mut f.renderer,
            SubtaskCommand::Add {
                task_id: "404".to_string(),
                title: "x".to_string(),
            },
            at(7),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no task with id 404"));
    }
}
