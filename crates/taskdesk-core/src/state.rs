use anyhow::Context;
use tracing::{debug, info};

use crate::auth::AuthGate;
use crate::settings::Settings;
use crate::storage::{
    COMMENTS_KEY, LocalStorage, SESSION_KEY, SETTINGS_KEY, SUBTASKS_KEY, TASKS_KEY, USERS_KEY,
};
use crate::store::TaskStore;
use crate::user::User;

/// Everything the application knows, loaded once per invocation and written
/// back key by key after a mutation.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub auth: AuthGate,
    pub tasks: TaskStore,
    pub settings: Settings,
}

impl AppState {
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: &LocalStorage) -> anyhow::Result<Self> {
        let users: Vec<User> = storage.load_json(USERS_KEY)?.unwrap_or_default();
        let snapshot: Option<User> = storage.load_json(SESSION_KEY)?;
        let auth = AuthGate::restore(users, snapshot);

        let tasks = TaskStore::new(
            storage.load_json(TASKS_KEY)?.unwrap_or_default(),
            storage.load_json(COMMENTS_KEY)?.unwrap_or_default(),
            storage.load_json(SUBTASKS_KEY)?.unwrap_or_default(),
        );
        let settings = storage.load_json(SETTINGS_KEY)?.unwrap_or_default();

        info!(
            users = auth.users().len(),
            authenticated = auth.is_authenticated(),
            tasks = tasks.tasks.len(),
            comments = tasks.comments.len(),
            subtasks = tasks.subtasks.len(),
            "loaded application state"
        );

        Ok(Self {
            auth,
            tasks,
            settings,
        })
    }

    /// Writes `users` and the `user` session snapshot. An anonymous state
    /// removes the snapshot.
    #[tracing::instrument(skip(self, storage))]
    pub fn save_auth(&self, storage: &LocalStorage) -> anyhow::Result<()> {
        storage
            .save_json(USERS_KEY, self.auth.users())
            .context("failed to save user list")?;
        match self.auth.current_user() {
            Some(user) => storage.save_json(SESSION_KEY, user)?,
            None => storage.remove_item(SESSION_KEY)?,
        }
        debug!("saved auth state");
        Ok(())
    }

    #[tracing::instrument(skip(self, storage))]
    pub fn save_tasks(&self, storage: &LocalStorage) -> anyhow::Result<()> {
        storage.save_json(TASKS_KEY, &self.tasks.tasks)?;
        storage.save_json(COMMENTS_KEY, &self.tasks.comments)?;
        storage.save_json(SUBTASKS_KEY, &self.tasks.subtasks)?;
        debug!(tasks = self.tasks.tasks.len(), "saved task state");
        Ok(())
    }

    #[tracing::instrument(skip(self, storage))]
    pub fn save_settings(&self, storage: &LocalStorage) -> anyhow::Result<()> {
        storage.save_json(SETTINGS_KEY, &self.settings)
    }

    pub fn save(&self, storage: &LocalStorage) -> anyhow::Result<()> {
        self.save_auth(storage)?;
        self.save_tasks(storage)?;
        self.save_settings(storage)
    }
}
