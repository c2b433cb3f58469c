//! In-memory store of active pairing sessions.
//!
//! [`PairingRegistry`] keeps every session, plus tombstones of recently
//! expired codes, behind a single [`tokio::sync::Mutex`]. HTTP handlers,
//! WebSocket connections and the sweeper all funnel through that one lock,
//! so "look up → check not expired → check role free → assign" is a single
//! critical section and can never interleave with an eviction.
//!
//! Notices to participants are pushed into bounded channels with `try_send`
//! while the lock is held. Pushing never blocks, and the order in which two
//! relays acquire the lock is the order in which the peer receives them. A
//! peer whose queue is full is treated like one that is gone.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use super::pairing_session::{PairingSession, PairingSnapshot};
use super::{ConnectionId, Metadata, PairingCode, Participant, PeerEvent, Role, SignalKind};
use crate::error::RelayError;

/// Collision retries allowed before giving up on code generation.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Hard ceiling on session TTL. Together with the 10⁶ code space this bounds
/// how long a code can be guessed at.
pub const MAX_TTL_SECS: u64 = 900;

/// Tunables for session lifetime and pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryPolicy {
    /// Smallest TTL a creator may request.
    pub min_ttl_secs: u64,
    /// Largest TTL a creator may request. Clamped to [`MAX_TTL_SECS`].
    pub max_ttl_secs: u64,
    /// TTL used when the creator does not ask for one.
    pub default_ttl_secs: u64,
    /// How long an emptied session survives before the sweeper prunes it.
    pub abandoned_grace_secs: u64,
    /// How long an expired code keeps answering `Expired` instead of
    /// `NotFound`.
    pub expired_retention_secs: u64,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            min_ttl_secs: 30,
            max_ttl_secs: MAX_TTL_SECS,
            default_ttl_secs: 300,
            abandoned_grace_secs: 60,
            expired_retention_secs: 300,
        }
    }
}

impl RegistryPolicy {
    /// Validates a requested TTL, falling back to the default when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] if the TTL is outside
    /// `[min_ttl_secs, max_ttl_secs]`.
    pub fn resolve_ttl(&self, requested: Option<u64>) -> Result<u64, RelayError> {
        let max = self.max_ttl_secs.min(MAX_TTL_SECS);
        let min = self.min_ttl_secs.min(max);
        let ttl = requested.unwrap_or_else(|| self.default_ttl_secs.clamp(min, max));
        if !(min..=max).contains(&ttl) {
            return Err(RelayError::InvalidRequest(format!(
                "ttlSeconds must be between {min} and {max}, got {ttl}"
            )));
        }
        Ok(ttl)
    }
}

/// Result of a successful session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingTicket {
    /// Newly allocated code.
    pub code: PairingCode,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Effective TTL in seconds.
    pub ttl_secs: u64,
}

/// The peer already attached when a participant registers.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerInfo {
    /// Peer role.
    pub role: Role,
    /// Peer-supplied metadata.
    pub metadata: Metadata,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Session expiry.
    pub expires_at: DateTime<Utc>,
    /// The other role, if it was already attached.
    pub peer: Option<PeerInfo>,
}

/// What one sweep pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions evicted because their TTL passed.
    pub expired: usize,
    /// Empty sessions pruned after the abandoned grace period.
    pub abandoned: usize,
    /// Participants sent `SessionExpired` and detached.
    pub disconnected: usize,
    /// Expired-code tombstones dropped.
    pub tombstones_pruned: usize,
}

impl SweepReport {
    /// Returns `true` if the pass changed nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.expired == 0
            && self.abandoned == 0
            && self.disconnected == 0
            && self.tombstones_pruned == 0
    }
}

/// Aggregate registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Sessions currently stored.
    pub active_sessions: usize,
    /// Participants attached across all sessions.
    pub connected_participants: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    sessions: HashMap<PairingCode, PairingSession>,
    /// Expired code → the `expires_at` it had.
    tombstones: HashMap<PairingCode, DateTime<Utc>>,
}

impl RegistryState {
    /// Resolves a live session, evicting it first if it has expired.
    fn live_mut(
        &mut self,
        code: PairingCode,
        now: DateTime<Utc>,
    ) -> Result<&mut PairingSession, RelayError> {
        let expired = match self.sessions.get(&code) {
            Some(session) => session.is_expired_at(now),
            None if self.tombstones.contains_key(&code) => {
                return Err(RelayError::Expired(code.to_string()));
            }
            None => return Err(RelayError::NotFound(code.to_string())),
        };
        if expired {
            self.evict_expired(code);
            return Err(RelayError::Expired(code.to_string()));
        }
        self.sessions
            .get_mut(&code)
            .ok_or_else(|| RelayError::NotFound(code.to_string()))
    }

    /// Removes an expired session, tells its participants, and tombstones
    /// the code. Returns how many participants were attached.
    fn evict_expired(&mut self, code: PairingCode) -> usize {
        let Some(mut session) = self.sessions.remove(&code) else {
            return 0;
        };
        self.tombstones.insert(code, session.expires_at);
        let disconnected = session.disconnect_all(&PeerEvent::SessionExpired);
        tracing::info!(%code, disconnected, "pairing expired");
        disconnected
    }
}

/// Central store for all pairing sessions.
///
/// # Concurrency
///
/// One mutex guards the whole registry. There are no per-session locks, so
/// there is no lock ordering to get wrong.
#[derive(Debug)]
pub struct PairingRegistry {
    state: Mutex<RegistryState>,
    policy: RegistryPolicy,
}

impl PairingRegistry {
    /// Creates an empty registry with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(RegistryPolicy::default())
    }

    /// Creates an empty registry with the given policy.
    #[must_use]
    pub fn with_policy(policy: RegistryPolicy) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            policy,
        }
    }

    /// Creates a session with a freshly generated code.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] for an out-of-range TTL and
    /// [`RelayError::CodeSpaceExhausted`] if every generated code collided.
    pub async fn create(
        &self,
        ttl_secs: Option<u64>,
        metadata: Metadata,
    ) -> Result<PairingTicket, RelayError> {
        self.create_with(ttl_secs, metadata, PairingCode::random)
            .await
    }

    /// Creates a session drawing candidate codes from `next_code`.
    ///
    /// Each candidate that collides with an active session is discarded and
    /// a new one drawn, up to [`MAX_CODE_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn create_with<F>(
        &self,
        ttl_secs: Option<u64>,
        metadata: Metadata,
        mut next_code: F,
    ) -> Result<PairingTicket, RelayError>
    where
        F: FnMut() -> PairingCode,
    {
        let ttl_secs = self.policy.resolve_ttl(ttl_secs)?;
        let ttl = seconds(ttl_secs);
        let mut state = self.state.lock().await;
        let now = Utc::now();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = next_code();
            if state.sessions.contains_key(&code) {
                tracing::debug!(%code, attempt, "pairing code collision");
                continue;
            }
            state.tombstones.remove(&code);
            let session = PairingSession::new(code, ttl, metadata, now);
            let ticket = PairingTicket {
                code,
                created_at: session.created_at,
                expires_at: session.expires_at,
                ttl_secs,
            };
            state.sessions.insert(code, session);
            tracing::info!(%code, ttl_secs, "pairing created");
            return Ok(ticket);
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "pairing code space exhausted");
        Err(RelayError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Returns a snapshot of the session under `code`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_at`].
    pub async fn get(&self, code: &str) -> Result<PairingSnapshot, RelayError> {
        self.get_at(code, Utc::now()).await
    }

    /// Returns a snapshot of the session under `code` as of `now`.
    ///
    /// An expired session is evicted on the spot.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for unknown or malformed codes and
    /// [`RelayError::Expired`] if the TTL has passed.
    pub async fn get_at(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<PairingSnapshot, RelayError> {
        let code = parse_code(code)?;
        let mut state = self.state.lock().await;
        state
            .live_mut(code, now)
            .map(|session| PairingSnapshot::from(&*session))
    }

    /// Cancels a session, sending `Terminated` to everyone attached.
    ///
    /// Returns the number of participants that were disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for unknown codes and
    /// [`RelayError::Expired`] for codes that already expired.
    pub async fn cancel(&self, code: &str) -> Result<usize, RelayError> {
        let code = parse_code(code)?;
        let mut state = self.state.lock().await;
        let Some(mut session) = state.sessions.remove(&code) else {
            return Err(if state.tombstones.contains_key(&code) {
                RelayError::Expired(code.to_string())
            } else {
                RelayError::NotFound(code.to_string())
            });
        };
        let disconnected = session.disconnect_all(&PeerEvent::Terminated);
        tracing::info!(%code, disconnected, "pairing cancelled");
        Ok(disconnected)
    }

    /// Binds `participant` to its role slot in the session under `code`.
    ///
    /// # Errors
    ///
    /// See [`Self::register_at`].
    pub async fn register(
        &self,
        code: PairingCode,
        participant: Participant,
    ) -> Result<Registration, RelayError> {
        self.register_at(code, participant, Utc::now()).await
    }

    /// Binds `participant` to its role slot as of `now`.
    ///
    /// If the other role is attached it is sent `PeerReady` describing the
    /// newcomer before the lock is released, and the returned
    /// [`Registration`] describes it back.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`], [`RelayError::Expired`] or
    /// [`RelayError::RoleConflict`]. A conflict leaves the existing binding
    /// untouched.
    pub async fn register_at(
        &self,
        code: PairingCode,
        participant: Participant,
        now: DateTime<Utc>,
    ) -> Result<Registration, RelayError> {
        let mut state = self.state.lock().await;
        let session = state.live_mut(code, now)?;

        let role = participant.role;
        let connection_id = participant.connection_id;
        let metadata = participant.metadata.clone();
        if session.attach(participant).is_err() {
            tracing::warn!(%code, %role, "role already taken");
            return Err(RelayError::RoleConflict(role));
        }

        let peer = session.participant(role.peer()).map(|peer| {
            let _ = peer.notify(PeerEvent::PeerReady { role, metadata });
            PeerInfo {
                role: peer.role,
                metadata: peer.metadata.clone(),
            }
        });

        tracing::info!(
            %code,
            %role,
            %connection_id,
            peer_connected = peer.is_some(),
            "participant registered"
        );
        Ok(Registration {
            expires_at: session.expires_at,
            peer,
        })
    }

    /// Forwards a signal from the `from` role to its peer.
    ///
    /// Signals are never buffered: with no peer attached the frame is
    /// dropped and the sender told.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::PeerNotConnected`] if no peer is attached, its
    /// socket is already closing or its outbound queue is full, [`RelayError::InvalidMessage`] if the
    /// sender no longer owns its slot, and [`RelayError::NotFound`] /
    /// [`RelayError::Expired`] if the session is gone.
    pub async fn relay(
        &self,
        code: PairingCode,
        from: Role,
        connection_id: ConnectionId,
        kind: SignalKind,
        payload: serde_json::Value,
    ) -> Result<(), RelayError> {
        let mut state = self.state.lock().await;
        let session = state.live_mut(code, Utc::now())?;
        if !session.is_bound(from, connection_id) {
            return Err(RelayError::InvalidMessage(
                "connection is not registered to this pairing".to_string(),
            ));
        }
        let Some(peer) = session.participant(from.peer()) else {
            tracing::debug!(%code, %from, ?kind, "signal dropped: no peer");
            return Err(RelayError::PeerNotConnected);
        };
        if !peer.notify(PeerEvent::Signal {
            from,
            kind,
            payload,
        }) {
            tracing::debug!(%code, %from, ?kind, "signal dropped: peer queue full or closed");
            return Err(RelayError::PeerNotConnected);
        }
        Ok(())
    }

    /// Detaches the participant owned by `connection_id` from `role`.
    ///
    /// The remaining peer, if any, receives exactly one `PeerLeft`. An
    /// emptied session stays in place until the sweeper prunes it.
    ///
    /// Returns `false` if the binding no longer existed.
    pub async fn leave(&self, code: PairingCode, role: Role, connection_id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&code) else {
            return false;
        };
        if session.detach(role, connection_id, Utc::now()).is_none() {
            return false;
        }
        if let Some(peer) = session.participant(role.peer()) {
            let _ = peer.notify(PeerEvent::PeerLeft { role });
        }
        tracing::info!(%code, %role, %connection_id, "participant left");
        true
    }

    /// Runs one sweep pass as of now.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep pass as of `now`.
    ///
    /// Evicts expired sessions (participants get `SessionExpired`), prunes
    /// sessions that have been empty for the abandoned grace period, and
    /// drops tombstones past their retention window.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let grace = seconds(self.policy.abandoned_grace_secs);
        let retention = seconds(self.policy.expired_retention_secs);
        let mut state = self.state.lock().await;
        let mut report = SweepReport::default();

        let expired: Vec<PairingCode> = state
            .sessions
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.code)
            .collect();
        for code in expired {
            report.disconnected += state.evict_expired(code);
            report.expired += 1;
        }

        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, session| !session.is_abandoned_at(now, grace));
        report.abandoned = before - state.sessions.len();

        let before = state.tombstones.len();
        state
            .tombstones
            .retain(|_, expired_at| now - *expired_at < retention);
        report.tombstones_pruned = before - state.tombstones.len();

        report
    }

    /// Returns aggregate counters.
    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        RegistryStats {
            active_sessions: state.sessions.len(),
            connected_participants: state
                .sessions
                .values()
                .map(PairingSession::participant_count)
                .sum(),
        }
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Returns `true` if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.sessions.is_empty()
    }
}

impl Default for PairingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_code(raw: &str) -> Result<PairingCode, RelayError> {
    raw.parse()
        .map_err(|_| RelayError::NotFound(raw.to_string()))
}

fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
