// Session workflows: account check, login, logoff and action batches.

use crate::domain::errors::{ActionError, StoreError};
use crate::domain::ports::PlayerStore;
use crate::domain::PlayerId;
use crate::use_cases::types::{SpawnOutcome, WorldCommand, WorldStatus};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

// Accounts created implicitly by the account check get this address.
const PLACEHOLDER_EMAIL: &str = "test@mail.com";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("world task is not running")]
    WorldUnavailable,
    #[error("world command queue is full")]
    QueueFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    AccountCreated,
    Good,
    Bad,
}

/// Session use cases with injected persistence and the world command channel.
pub struct SessionService<S> {
    pub store: Arc<S>,
    pub commands: mpsc::Sender<WorldCommand>,
}

impl<S> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            commands: self.commands.clone(),
        }
    }
}

impl<S> SessionService<S>
where
    S: PlayerStore,
{
    pub fn new(store: Arc<S>, commands: mpsc::Sender<WorldCommand>) -> Self {
        Self { store, commands }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WorldCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SessionError::WorldUnavailable)?;
        rx.await.map_err(|_| SessionError::WorldUnavailable)
    }

    /// Unknown accounts are registered on the spot; known ones must be offline and match.
    pub async fn check_player(&self, name: &str, password: &str) -> Result<CheckOutcome, SessionError> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Ok(CheckOutcome::Bad);
        }

        if !self.store.account_exists(name).await? {
            self.store
                .create_account(name, password, PLACEHOLDER_EMAIL)
                .await?;
            info!(name, "new account created");
            return Ok(CheckOutcome::AccountCreated);
        }

        let name_owned = name.to_string();
        let online = self
            .request(|reply| WorldCommand::IsOnline {
                name: name_owned,
                reply,
            })
            .await?;
        if online {
            return Ok(CheckOutcome::Bad);
        }

        if self.store.validate_login(name, password).await? {
            Ok(CheckOutcome::Good)
        } else {
            Ok(CheckOutcome::Bad)
        }
    }

    /// Loads the character and places it in the world.
    pub async fn login(&self, name: &str, addr: SocketAddr) -> Result<SpawnOutcome, SessionError> {
        let record = self.store.load_player(name).await?;
        let name_owned = name.to_string();
        let outcome = self
            .request(|reply| WorldCommand::Spawn {
                name: name_owned,
                addr,
                record,
                reply,
            })
            .await?;

        if let SpawnOutcome::Accepted { map, .. } = &outcome {
            if let Err(e) = self.store.save_map_assignment(map, name).await {
                warn!(name, %map, error = %e, "failed to save map assignment");
            }
        }
        Ok(outcome)
    }

    /// Removes the character from the world and persists it. Returns whether it was online.
    ///
    /// Persistence failures are logged; the player is gone from the world either way.
    pub async fn logoff(&self, name: &str) -> Result<bool, SessionError> {
        let name_owned = name.to_string();
        let Some(record) = self
            .request(|reply| WorldCommand::Despawn {
                name: name_owned,
                reply,
            })
            .await?
        else {
            return Ok(false);
        };

        if let Err(e) = self.store.save_player(&record).await {
            warn!(name, error = %e, "failed to save player on logoff");
        }
        if let Err(e) = self.store.flush().await {
            warn!(error = %e, "failed to flush player store");
        }
        Ok(true)
    }

    pub async fn action_batch(
        &self,
        name: &str,
        actions: Vec<String>,
    ) -> Result<Vec<Result<(), ActionError>>, SessionError> {
        let owner = name.to_string();
        self.request(|reply| WorldCommand::Actions {
            owner,
            actions,
            reply,
        })
        .await
    }

    /// Queues a movement request without waiting; a full queue drops it.
    pub fn try_move(&self, player_id: PlayerId, x_speed: i32, y_speed: i32) -> Result<(), SessionError> {
        self.commands
            .try_send(WorldCommand::Move {
                player_id,
                x_speed,
                y_speed,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => SessionError::QueueFull,
                TrySendError::Closed(_) => SessionError::WorldUnavailable,
            })
    }

    pub async fn status(&self) -> Result<WorldStatus, SessionError> {
        self.request(|reply| WorldCommand::Status { reply }).await
    }
}
