//! Pairing session aggregate and its read-only snapshot.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::{ConnectionId, Metadata, PairingCode, Participant, PeerEvent, Role};

/// Live pairing session stored in the [`super::PairingRegistry`].
///
/// Holds at most one [`Participant`] per [`Role`]. Only the registry
/// mutates sessions, always under its lock.
#[derive(Debug)]
pub struct PairingSession {
    /// Session code (immutable after creation).
    pub code: PairingCode,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// `created_at + ttl`. The session is dead from this instant on.
    pub expires_at: DateTime<Utc>,

    /// Opaque creator-supplied metadata.
    pub metadata: Metadata,

    /// Set when the last attached participant leaves; cleared when someone
    /// registers again.
    pub last_departure_at: Option<DateTime<Utc>>,

    desktop: Option<Participant>,
    mobile: Option<Participant>,
}

impl PairingSession {
    /// Creates an empty session that lives for `ttl` from `now`.
    #[must_use]
    pub fn new(code: PairingCode, ttl: TimeDelta, metadata: Metadata, now: DateTime<Utc>) -> Self {
        Self {
            code,
            created_at: now,
            expires_at: now + ttl,
            metadata,
            last_departure_at: None,
            desktop: None,
            mobile: None,
        }
    }

    /// Returns `true` if the TTL has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns the participant occupying `role`, if any.
    #[must_use]
    pub fn participant(&self, role: Role) -> Option<&Participant> {
        match role {
            Role::Desktop => self.desktop.as_ref(),
            Role::Mobile => self.mobile.as_ref(),
        }
    }

    /// Returns `true` if `connection_id` currently owns the `role` slot.
    #[must_use]
    pub fn is_bound(&self, role: Role, connection_id: ConnectionId) -> bool {
        self.participant(role)
            .is_some_and(|p| p.connection_id == connection_id)
    }

    /// Places `participant` in its role slot.
    ///
    /// Returns the participant back if the slot is already taken.
    pub fn attach(&mut self, participant: Participant) -> Result<(), Participant> {
        let slot = self.slot_mut(participant.role);
        if slot.is_some() {
            return Err(participant);
        }
        *slot = Some(participant);
        self.last_departure_at = None;
        Ok(())
    }

    /// Empties the `role` slot if `connection_id` still owns it.
    pub fn detach(
        &mut self,
        role: Role,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
    ) -> Option<Participant> {
        if !self.is_bound(role, connection_id) {
            return None;
        }
        let removed = self.slot_mut(role).take();
        if self.is_empty() {
            self.last_departure_at = Some(now);
        }
        removed
    }

    /// Sends `event` to every attached participant and empties both slots.
    ///
    /// Returns the number of participants that were attached.
    pub fn disconnect_all(&mut self, event: &PeerEvent) -> usize {
        let mut count = 0;
        for participant in [self.desktop.take(), self.mobile.take()].into_iter().flatten() {
            let _ = participant.notify(event.clone());
            count += 1;
        }
        count
    }

    /// Returns `true` if no role is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }

    /// Number of occupied role slots.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        usize::from(self.desktop.is_some()) + usize::from(self.mobile.is_some())
    }

    /// Returns `true` if the session emptied out more than `grace` ago.
    #[must_use]
    pub fn is_abandoned_at(&self, now: DateTime<Utc>, grace: TimeDelta) -> bool {
        self.is_empty()
            && self
                .last_departure_at
                .is_some_and(|left| now - left >= grace)
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<Participant> {
        match role {
            Role::Desktop => &mut self.desktop,
            Role::Mobile => &mut self.mobile,
        }
    }
}

/// Which role slots of a session are occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleOccupancy {
    /// Desktop slot occupied.
    pub desktop: bool,
    /// Mobile slot occupied.
    pub mobile: bool,
}

/// Point-in-time copy of a session for read endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingSnapshot {
    /// Session code.
    pub code: PairingCode,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Creator-supplied metadata.
    pub metadata: Metadata,
    /// Role slot occupancy.
    pub roles: RoleOccupancy,
}

impl From<&PairingSession> for PairingSnapshot {
    fn from(session: &PairingSession) -> Self {
        Self {
            code: session.code,
            created_at: session.created_at,
            expires_at: session.expires_at,
            metadata: session.metadata.clone(),
            roles: RoleOccupancy {
                desktop: session.desktop.is_some(),
                mobile: session.mobile.is_some(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn session(now: DateTime<Utc>) -> PairingSession {
        let Some(code) = PairingCode::from_number(123_456) else {
            panic!("valid code");
        };
        PairingSession::new(code, TimeDelta::seconds(60), Metadata::new(), now)
    }

    fn participant(role: Role) -> (Participant, mpsc::Receiver<PeerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Participant::new(role, ConnectionId::new(), Metadata::new(), tx),
            rx,
        )
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let s = session(now);
        assert!(!s.is_expired_at(now + TimeDelta::seconds(59)));
        assert!(s.is_expired_at(now + TimeDelta::seconds(60)));
    }

    #[test]
    fn attach_rejects_occupied_slot() {
        let mut s = session(Utc::now());
        let (first, _rx1) = participant(Role::Desktop);
        let first_id = first.connection_id;
        assert!(s.attach(first).is_ok());

        let (second, _rx2) = participant(Role::Desktop);
        assert!(s.attach(second).is_err());
        assert!(s.is_bound(Role::Desktop, first_id));
    }

    #[test]
    fn detach_ignores_foreign_connection() {
        let now = Utc::now();
        let mut s = session(now);
        let (p, _rx) = participant(Role::Mobile);
        let id = p.connection_id;
        assert!(s.attach(p).is_ok());

        assert!(s.detach(Role::Mobile, ConnectionId::new(), now).is_none());
        assert_eq!(s.participant_count(), 1);

        assert!(s.detach(Role::Mobile, id, now).is_some());
        assert!(s.is_empty());
        assert_eq!(s.last_departure_at, Some(now));
    }

    #[test]
    fn abandoned_only_after_grace() {
        let now = Utc::now();
        let mut s = session(now);
        assert!(!s.is_abandoned_at(now + TimeDelta::seconds(30), TimeDelta::seconds(10)));

        let (p, _rx) = participant(Role::Desktop);
        let id = p.connection_id;
        assert!(s.attach(p).is_ok());
        let _ = s.detach(Role::Desktop, id, now);

        assert!(!s.is_abandoned_at(now + TimeDelta::seconds(5), TimeDelta::seconds(10)));
        assert!(s.is_abandoned_at(now + TimeDelta::seconds(10), TimeDelta::seconds(10)));
    }

    #[tokio::test]
    async fn disconnect_all_notifies_and_clears() {
        let mut s = session(Utc::now());
        let (d, mut drx) = participant(Role::Desktop);
        let (m, mut mrx) = participant(Role::Mobile);
        assert!(s.attach(d).is_ok());
        assert!(s.attach(m).is_ok());

        assert_eq!(s.disconnect_all(&PeerEvent::Terminated), 2);
        assert!(s.is_empty());
        assert_eq!(drx.recv().await, Some(PeerEvent::Terminated));
        assert_eq!(mrx.recv().await, Some(PeerEvent::Terminated));
    }

    #[test]
    fn snapshot_reports_occupancy() {
        let mut s = session(Utc::now());
        let (m, _rx) = participant(Role::Mobile);
        assert!(s.attach(m).is_ok());
        let snap = PairingSnapshot::from(&s);
        assert_eq!(
            snap.roles,
            RoleOccupancy {
                desktop: false,
                mobile: true
            }
        );
    }
}
