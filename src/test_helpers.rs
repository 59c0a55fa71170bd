use crate::gateway::{
    CoinUpdate,
    GameGateway,
    Player,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GatewayCall {
    GetUser(String),
    CreateUser(String),
    UpdateCoins(String, u64),
}

#[derive(Default)]
struct FakeState {
    players: HashMap<String, Player>,
    calls: Vec<GatewayCall>,
    next_id: u64,
    fail_get: Option<String>,
    fail_create: Option<String>,
    fail_update: Option<String>,
}

/// In-memory gateway that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    pub fn with_player(player: Player) -> Self {
        let fake = Self::default();
        fake.lock().players.insert(player.username.clone(), player);
        fake
    }

    pub fn fail_lookups(&self, message: &str) {
        self.lock().fail_get = Some(message.to_string());
    }

    pub fn fail_creates(&self, message: &str) {
        self.lock().fail_create = Some(message.to_string());
    }

    pub fn fail_updates(&self, message: &str) {
        self.lock().fail_update = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn update_calls(&self) -> Vec<(String, u64)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                GatewayCall::UpdateCoins(id, coins) => Some((id.clone(), *coins)),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

impl GameGateway for FakeGateway {
    async fn get_user(&self, username: &str) -> Result<Option<Player>> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::GetUser(username.to_string()));
        if let Some(message) = &state.fail_get {
            return Err(eyre!("{message}"));
        }
        Ok(state.players.get(username).cloned())
    }

    async fn create_user(&self, username: &str) -> Result<Player> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::CreateUser(username.to_string()));
        if let Some(message) = &state.fail_create {
            return Err(eyre!("{message}"));
        }
        state.next_id += 1;
        let player = Player {
            id: format!("player-{}", state.next_id),
            username: username.to_string(),
            coins: 0,
        };
        state.players.insert(username.to_string(), player.clone());
        Ok(player)
    }

    async fn update_coins(&self, id: &str, coins: u64) -> Result<CoinUpdate> {
        let mut state = self.lock();
        state
            .calls
            .push(GatewayCall::UpdateCoins(id.to_string(), coins));
        if let Some(message) = &state.fail_update {
            return Err(eyre!("{message}"));
        }
        let player = state
            .players
            .values_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| eyre!("no player with id {id}"))?;
        player.coins = coins;
        Ok(CoinUpdate {
            id: id.to_string(),
            coins,
        })
    }
}
