use crate::{
    gateway::{
        CoinUpdate,
        GameGateway,
        Player,
    },
    identity::IdentityProvider,
    markers::{
        Marker,
        MarkerBoard,
        MarkerId,
        TapPosition,
    },
    progress::{
        LevelUpRule,
        Progression,
    },
};
use chrono::{
    DateTime,
    Local,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{
    debug,
    error,
    info,
};

const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionPhase {
    Loading,
    Ready,
    Error(String),
}

/// Completions reported back to the loop that owns the controller.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    MarkerExpired(MarkerId),
    CoinsPersisted { seq: u64, update: CoinUpdate },
    PersistFailed { seq: u64, coins: u64, error: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TapOutcome {
    pub coins: u64,
    pub marker: MarkerId,
    pub leveled_up: bool,
    /// Sequence number of the persistence request, if one was issued.
    pub persist_seq: Option<u64>,
}

/// Read-only view handed to the renderer.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub username: Option<String>,
    pub player_id: Option<String>,
    pub coins: u64,
    pub progress: u32,
    pub level: u32,
    pub markers: Vec<Marker>,
    pub confirmed_coins: Option<u64>,
    pub pending_writes: usize,
    pub failed_writes: u64,
    pub last_synced: Option<DateTime<Local>>,
    pub errors: Vec<String>,
}

pub struct SessionController<G> {
    gateway: Arc<G>,
    identity: Box<dyn IdentityProvider>,
    rule: LevelUpRule,
    phase: SessionPhase,
    username: Option<String>,
    player: Option<Player>,
    coins: u64,
    progression: Progression,
    markers: MarkerBoard,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    next_seq: u64,
    acked_seq: Option<u64>,
    confirmed_coins: Option<u64>,
    pending_writes: usize,
    failed_writes: u64,
    last_synced: Option<DateTime<Local>>,
    errors: Vec<String>,
}

impl<G: GameGateway> SessionController<G> {
    pub fn new(
        gateway: Arc<G>,
        identity: Box<dyn IdentityProvider>,
        rule: LevelUpRule,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_markers(gateway, identity, rule, MarkerBoard::default())
    }

    pub fn with_markers(
        gateway: Arc<G>,
        identity: Box<dyn IdentityProvider>,
        rule: LevelUpRule,
        markers: MarkerBoard,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            gateway,
            identity,
            rule,
            phase: SessionPhase::Loading,
            username: None,
            player: None,
            coins: 0,
            progression: Progression::default(),
            markers,
            events_tx,
            next_seq: 0,
            acked_seq: None,
            confirmed_coins: None,
            pending_writes: 0,
            failed_writes: 0,
            last_synced: None,
            errors: Vec::new(),
        };
        (controller, events_rx)
    }

    /// Looks the player up by display name, creating it when absent.
    ///
    /// A failed lookup moves the session to [`SessionPhase::Error`]; a failed
    /// create is only recorded, leaving the session ready but unable to persist.
    pub async fn initialize(&mut self) {
        if self.phase != SessionPhase::Loading {
            debug!(phase = ?self.phase, "session already initialized");
            return;
        }
        let Some(username) = self
            .identity
            .display_name()
            .filter(|name| !name.trim().is_empty())
        else {
            self.push_error("Username not found; cannot look up player");
            self.phase = SessionPhase::Ready;
            return;
        };
        self.username = Some(username.clone());
        info!(%username, "fetching player");

        match self.gateway.get_user(&username).await {
            Ok(Some(player)) => {
                info!(id = %player.id, coins = player.coins, "player found");
                self.adopt(player);
            }
            Ok(None) => {
                info!(%username, "player not found, creating");
                match self.gateway.create_user(&username).await {
                    Ok(player) => {
                        info!(id = %player.id, "player created");
                        self.adopt(player);
                    }
                    Err(err) => {
                        self.push_error(format!("Error creating user: {err:#}"));
                        self.phase = SessionPhase::Ready;
                    }
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "failed to load player");
                self.phase = SessionPhase::Error(message);
            }
        }
    }

    /// Applies a tap locally and, when the player is known, persists the new
    /// balance in the background. Taps are ignored while still loading.
    pub fn on_tap(&mut self, at: TapPosition) -> Option<TapOutcome> {
        if self.phase == SessionPhase::Loading {
            debug!("tap ignored while loading");
            return None;
        }
        self.coins = self.coins.saturating_add(1);
        let (progression, leveled_up) = self.progression.advance(self.rule);
        self.progression = progression;
        if leveled_up {
            info!(level = progression.level, "level up");
        }

        let tx = self.events_tx.clone();
        let marker = self.markers.place(at, move |id| {
            let _ = tx.send(SessionEvent::MarkerExpired(id));
        });

        let persist_seq = self.persist(self.coins);
        Some(TapOutcome {
            coins: self.coins,
            marker,
            leveled_up,
            persist_seq,
        })
    }

    fn persist(&mut self, coins: u64) -> Option<u64> {
        let Some(id) = self.player.as_ref().map(|p| p.id.clone()) else {
            self.push_error(
                "Player id not found; make sure the player was created before tapping",
            );
            return None;
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending_writes += 1;

        let gateway = Arc::clone(&self.gateway);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match gateway.update_coins(&id, coins).await {
                Ok(update) => SessionEvent::CoinsPersisted { seq, update },
                Err(err) => SessionEvent::PersistFailed {
                    seq,
                    coins,
                    error: format!("{err:#}"),
                },
            };
            let _ = tx.send(event);
        });
        Some(seq)
    }
}

impl<G> SessionController<G> {
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::MarkerExpired(id) => {
                self.markers.remove(id);
            }
            SessionEvent::CoinsPersisted { seq, update } => {
                self.pending_writes = self.pending_writes.saturating_sub(1);
                if self.acked_seq.is_some_and(|acked| seq < acked) {
                    debug!(seq, coins = update.coins, "ignoring stale coin update");
                    return;
                }
                self.acked_seq = Some(seq);
                self.confirmed_coins = Some(update.coins);
                self.last_synced = Some(Local::now());
                info!(seq, coins = update.coins, "Coins updated successfully");
            }
            SessionEvent::PersistFailed { seq, coins, error } => {
                self.pending_writes = self.pending_writes.saturating_sub(1);
                self.failed_writes += 1;
                self.push_error(format!("Error updating coins to {coins} (#{seq}): {error}"));
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase.clone(),
            username: self.username.clone(),
            player_id: self.player.as_ref().map(|p| p.id.clone()),
            coins: self.coins,
            progress: self.progression.progress,
            level: self.progression.level,
            markers: self.markers.markers().to_vec(),
            confirmed_coins: self.confirmed_coins,
            pending_writes: self.pending_writes,
            failed_writes: self.failed_writes,
            last_synced: self.last_synced,
            errors: self.errors.clone(),
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn progression(&self) -> Progression {
        self.progression
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.markers()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn adopt(&mut self, player: Player) {
        self.coins = player.coins;
        self.confirmed_coins = Some(player.coins);
        self.player = Some(player);
        self.phase = SessionPhase::Ready;
    }

    fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}
