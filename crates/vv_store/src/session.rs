//! Vault sessions: in-memory key material unlocked by user password.
//!
//! Each user gets a session slot holding their 32-byte vault key while
//! unlocked. Locking (explicit or via the inactivity timer) drops the state
//! and zeroizes the key from memory.
//!
//! Auto-lock is enforced lazily: nothing runs in the background, the elapsed
//! time is checked whenever a session is consulted. A gated operation takes a
//! [`SessionGuard`], which serialises it against lock/unlock and against
//! other operations for the same user. Different users never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::StoreError;
use crate::models::UserId;
use vv_crypto::kdf::{vault_key_from_password, VaultKey};

/// Default inactivity timeout before a session locks itself (5 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(ZeroizeOnDrop)]
struct UnlockedState {
    key: [u8; 32],
    #[zeroize(skip)]
    last_activity: Instant,
}

#[derive(Default)]
struct SessionSlot {
    state: Option<UnlockedState>,
}

impl SessionSlot {
    /// Lazy auto-lock: wipe the state once the idle timeout has passed.
    /// A zero timeout disables auto-lock.
    fn expire_if_idle(&mut self, user_id: UserId, timeout: Duration) {
        if timeout.is_zero() {
            return;
        }
        if let Some(state) = self.state.as_ref() {
            if state.last_activity.elapsed() >= timeout {
                tracing::debug!("[session] user {} idle timeout reached, locking", user_id);
                self.state = None;
            }
        }
    }
}

/// Thread-safe session registry.  Clone to share across tasks.
#[derive(Clone)]
pub struct VaultSessions {
    slots: Arc<RwLock<HashMap<UserId, Arc<Mutex<SessionSlot>>>>>,
    idle_timeout: Duration,
}

impl VaultSessions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    async fn slot(&self, user_id: UserId) -> Arc<Mutex<SessionSlot>> {
        if let Some(slot) = self.slots.read().await.get(&user_id) {
            return slot.clone();
        }
        self.slots.write().await.entry(user_id).or_default().clone()
    }

    /// Derive the vault key from `password` + `salt` and install it for
    /// `user_id`, replacing any existing session state. Starts the
    /// inactivity timer. Call only after the master password has been
    /// verified against the stored credential.
    pub async fn unlock(
        &self,
        user_id: UserId,
        password: &[u8],
        salt: &[u8; 16],
    ) -> Result<(), StoreError> {
        let vault_key = vault_key_from_password(password, salt)?;
        self.unlock_with_key(user_id, vault_key).await;
        Ok(())
    }

    /// Install an already-derived key (e.g. right after a password change,
    /// where the new key is in hand from the re-encryption pass).
    pub async fn unlock_with_key(&self, user_id: UserId, key: VaultKey) {
        let slot = self.slot(user_id).await;
        let mut guard = slot.lock().await;
        guard.state = Some(UnlockedState {
            key: key.0,
            last_activity: Instant::now(),
        });
    }

    /// Lock `user_id`'s session; dropping the state zeroizes the key.
    /// A no-op when already locked. Waits for any in-flight gated operation
    /// to finish first.
    pub async fn lock(&self, user_id: UserId) {
        let slot = self.slot(user_id).await;
        slot.lock().await.state = None;
    }

    /// True when no usable session exists: never unlocked, explicitly
    /// locked, or idle past the timeout. Observing an expired session locks
    /// it on the spot.
    pub async fn is_locked(&self, user_id: UserId) -> bool {
        let slot = self.slot(user_id).await;
        let mut guard = slot.lock().await;
        guard.expire_if_idle(user_id, self.idle_timeout);
        guard.state.is_none()
    }

    /// Begin one gated operation: enforce the idle timeout, refresh the
    /// activity timer and hand out a [`SessionGuard`]. Blocks while another
    /// gated operation (or lock/unlock) for the same user is in flight.
    pub async fn begin(&self, user_id: UserId) -> Result<SessionGuard, StoreError> {
        let slot = self.slot(user_id).await;
        let mut guard = slot.lock_owned().await;
        guard.expire_if_idle(user_id, self.idle_timeout);
        let state = match guard.state.as_mut() {
            Some(state) => state,
            None => return Err(StoreError::VaultLocked),
        };
        state.last_activity = Instant::now();
        let key = Zeroizing::new(state.key);
        Ok(SessionGuard { key, slot: guard })
    }

    /// Time remaining until auto-lock fires for `user_id`, `None` when the
    /// session is locked. `Duration::MAX` when auto-lock is disabled.
    pub async fn time_until_lock(&self, user_id: UserId) -> Option<Duration> {
        let slot = self.slot(user_id).await;
        let guard = slot.lock().await;
        guard.state.as_ref().map(|state| {
            if self.idle_timeout.is_zero() {
                return Duration::MAX;
            }
            self.idle_timeout.saturating_sub(state.last_activity.elapsed())
        })
    }
}

impl Default for VaultSessions {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

/// Exclusive access to one user's unlocked session for the duration of a
/// single gated operation. Holds the slot mutex, so lock/unlock and other
/// operations for the same user wait until this guard drops. The key copy is
/// zeroized on drop.
pub struct SessionGuard {
    key: Zeroizing<[u8; 32]>,
    slot: OwnedMutexGuard<SessionSlot>,
}

impl SessionGuard {
    /// The session's derived vault key.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Replace the session key in place, restarting the inactivity timer.
    /// Used by the password change path, which already holds this guard
    /// across the re-encryption pass.
    pub fn install_key(&mut self, key: VaultKey) {
        self.slot.state = Some(UnlockedState {
            key: key.0,
            last_activity: Instant::now(),
        });
        self.key = Zeroizing::new(key.0);
    }
}
