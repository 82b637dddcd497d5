//! End-to-end vault scenarios through the public `VoiceVault` surface,
//! with a deterministic in-process speech provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use vv_core::{
    MemoStatus, ProviderError, ProviderSettings, SpeechProvider, Transcription, VaultConfig,
    VaultError, VaultStatus, VoiceVault,
};

const ALICE: i64 = 7001;
const BOB: i64 = 7002;

// ── Provider fixture ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FixtureProvider {
    transcribe_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl FixtureProvider {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SpeechProvider for FixtureProvider {
    async fn transcribe(
        &self,
        audio: &[u8],
        _language_hint: Option<&str>,
    ) -> Result<Transcription, ProviderError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Rejected {
                status: 503,
                message: "overloaded".into(),
            });
        }
        Ok(Transcription {
            text: format!("voice note, {} bytes", audio.len()),
            language: Some("en".into()),
        })
    }

    async fn summarize(&self, transcript: &str) -> Result<String, ProviderError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Rejected {
                status: 503,
                message: "overloaded".into(),
            });
        }
        Ok(format!("summary of: {}", transcript))
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

async fn open_vault(provider: Arc<FixtureProvider>) -> (VoiceVault, TempDir) {
    open_vault_with_timeout(provider, 300).await
}

async fn open_vault_with_timeout(
    provider: Arc<FixtureProvider>,
    idle_timeout_secs: u64,
) -> (VoiceVault, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = VaultConfig {
        db_path: dir.path().join("vault.db"),
        idle_timeout_secs,
        provider: ProviderSettings {
            base_url: "http://127.0.0.1:1".into(),
            api_token: "unused".into(),
            request_timeout_secs: 5,
            language_hint: None,
        },
    };
    let vault = VoiceVault::open_with_provider(&config, provider)
        .await
        .expect("open vault");
    (vault, dir)
}

// ── Session scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn setup_unlock_capture_retrieve_lock_flow() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;

    assert_eq!(
        vault.status(ALICE).await.expect("status"),
        VaultStatus::Uninitialized
    );

    vault.setup(ALICE, "hunter2 but longer").await.expect("setup");
    assert_eq!(vault.status(ALICE).await.expect("status"), VaultStatus::Locked);

    vault.unlock(ALICE, "hunter2 but longer").await.expect("unlock");
    assert_eq!(vault.status(ALICE).await.expect("status"), VaultStatus::Unlocked);

    let audio = vec![0x52u8, 0x49, 0x46, 0x46, 1, 2, 3, 4, 5];
    let memo_id = vault.capture(ALICE, &audio).await.expect("capture");
    assert_eq!(vault.retrieve(&memo_id, ALICE).await.expect("retrieve"), audio);

    vault.lock(ALICE).await;
    assert_eq!(vault.status(ALICE).await.expect("status"), VaultStatus::Locked);
    assert!(matches!(
        vault.retrieve(&memo_id, ALICE).await,
        Err(VaultError::VaultLocked)
    ));

    // Unlocking again restores access to the same memo.
    vault.unlock(ALICE, "hunter2 but longer").await.expect("re-unlock");
    assert_eq!(vault.retrieve(&memo_id, ALICE).await.expect("retrieve"), audio);
}

#[tokio::test]
async fn wrong_password_never_unlocks() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "right password").await.expect("setup");

    // Each failed attempt is independently rejected; no lockout builds up.
    for _ in 0..3 {
        assert!(matches!(
            vault.unlock(ALICE, "wrong password").await,
            Err(VaultError::InvalidCredential)
        ));
        assert_eq!(vault.status(ALICE).await.expect("status"), VaultStatus::Locked);
    }

    vault.unlock(ALICE, "right password").await.expect("unlock still works");
}

#[tokio::test]
async fn unlock_before_setup_is_not_found() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    assert!(matches!(
        vault.unlock(ALICE, "anything").await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn setup_twice_is_already_exists() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "first").await.expect("setup");
    assert!(matches!(
        vault.setup(ALICE, "second").await,
        Err(VaultError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn every_memo_operation_requires_unlock() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "pw").await.expect("setup");

    assert!(matches!(
        vault.capture(ALICE, b"audio").await,
        Err(VaultError::VaultLocked)
    ));
    assert!(matches!(
        vault.list_memos(ALICE).await,
        Err(VaultError::VaultLocked)
    ));
    assert!(matches!(
        vault.request_transcript("no-such-memo", ALICE).await,
        Err(VaultError::VaultLocked)
    ));
}

#[tokio::test]
async fn inactivity_timeout_locks_the_session() {
    let (vault, _dir) =
        open_vault_with_timeout(Arc::new(FixtureProvider::default()), 1).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"quick note").await.expect("capture");

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(matches!(
        vault.retrieve(&memo_id, ALICE).await,
        Err(VaultError::VaultLocked)
    ));
    assert_eq!(vault.status(ALICE).await.expect("status"), VaultStatus::Locked);
}

// ── Lifecycle scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn transcripts_are_idempotent() {
    let provider = Arc::new(FixtureProvider::default());
    let (vault, _dir) = open_vault(provider.clone()).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"some audio").await.expect("capture");

    let first = vault
        .request_transcript(&memo_id, ALICE)
        .await
        .expect("first transcript");
    let second = vault
        .request_transcript(&memo_id, ALICE)
        .await
        .expect("second transcript");

    assert_eq!(first, second);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);

    let listing = vault.list_memos(ALICE).await.expect("list");
    assert_eq!(listing[0].status, MemoStatus::Transcribed);
    assert!(listing[0].has_transcript);
}

#[tokio::test]
async fn summary_derives_transcript_first() {
    let provider = Arc::new(FixtureProvider::default());
    let (vault, _dir) = open_vault(provider.clone()).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"ramble").await.expect("capture");

    let summary = vault
        .request_summary(&memo_id, ALICE)
        .await
        .expect("summary");
    assert!(summary.starts_with("summary of:"));
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.summarize_calls.load(Ordering::SeqCst), 1);

    // Second request serves the stored summary without the provider.
    let again = vault
        .request_summary(&memo_id, ALICE)
        .await
        .expect("stored summary");
    assert_eq!(summary, again);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.summarize_calls.load(Ordering::SeqCst), 1);

    let listing = vault.list_memos(ALICE).await.expect("list");
    assert_eq!(listing[0].status, MemoStatus::Summarized);
    assert!(listing[0].has_transcript);
    assert!(listing[0].has_summary);
}

#[tokio::test]
async fn provider_failure_leaves_the_memo_intact() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::failing())).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"some audio").await.expect("capture");

    match vault.request_transcript(&memo_id, ALICE).await {
        Err(VaultError::Provider { code, .. }) => assert_eq!(code, 503),
        other => panic!("expected provider error, got {other:?}"),
    }

    // Status rolled back, nothing half-written, audio still retrievable.
    let listing = vault.list_memos(ALICE).await.expect("list");
    assert_eq!(listing[0].status, MemoStatus::Stored);
    assert!(!listing[0].has_transcript);
    assert_eq!(
        vault.retrieve(&memo_id, ALICE).await.expect("retrieve"),
        b"some audio"
    );
}

#[tokio::test]
async fn users_cannot_touch_each_others_memos() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "alice pw").await.expect("setup alice");
    vault.unlock(ALICE, "alice pw").await.expect("unlock alice");
    vault.setup(BOB, "bob pw").await.expect("setup bob");
    vault.unlock(BOB, "bob pw").await.expect("unlock bob");

    let memo_id = vault.capture(ALICE, b"private").await.expect("capture");

    assert!(matches!(
        vault.retrieve(&memo_id, BOB).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        vault.delete_memo(&memo_id, BOB).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(vault.list_memos(BOB).await.expect("bob list").is_empty());

    // Alice is unaffected by Bob's attempts.
    assert_eq!(
        vault.retrieve(&memo_id, ALICE).await.expect("retrieve"),
        b"private"
    );
}

#[tokio::test]
async fn deletion_is_irreversible() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let keep = vault.capture(ALICE, b"keep me").await.expect("capture");
    let gone = vault.capture(ALICE, b"delete me").await.expect("capture");

    vault.delete_memo(&gone, ALICE).await.expect("delete");

    let listing = vault.list_memos(ALICE).await.expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, keep);

    assert!(matches!(
        vault.retrieve(&gone, ALICE).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        vault.delete_memo(&gone, ALICE).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        vault.request_transcript(&gone, ALICE).await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_is_newest_first() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let first = vault.capture(ALICE, b"one").await.expect("capture");
    let second = vault.capture(ALICE, b"two").await.expect("capture");
    let third = vault.capture(ALICE, b"three").await.expect("capture");

    let ids: Vec<String> = vault
        .list_memos(ALICE)
        .await
        .expect("list")
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![third, second, first]);
}

// ── Password change ──────────────────────────────────────────────────────────

#[tokio::test]
async fn change_password_reencrypts_existing_memos() {
    let provider = Arc::new(FixtureProvider::default());
    let (vault, _dir) = open_vault(provider.clone()).await;
    vault.setup(ALICE, "old password").await.expect("setup");
    vault.unlock(ALICE, "old password").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"dear diary").await.expect("capture");
    let transcript = vault
        .request_transcript(&memo_id, ALICE)
        .await
        .expect("transcript");

    vault
        .change_password(ALICE, "old password", "new password")
        .await
        .expect("change password");

    vault.lock(ALICE).await;
    assert!(matches!(
        vault.unlock(ALICE, "old password").await,
        Err(VaultError::InvalidCredential)
    ));
    vault.unlock(ALICE, "new password").await.expect("unlock with new");

    // Payloads sealed under the old key are readable under the new one,
    // without another provider call.
    assert_eq!(
        vault.retrieve(&memo_id, ALICE).await.expect("retrieve"),
        b"dear diary"
    );
    assert_eq!(
        vault
            .request_transcript(&memo_id, ALICE)
            .await
            .expect("stored transcript"),
        transcript
    );
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn change_password_needs_the_old_password_and_an_unlocked_session() {
    let (vault, _dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "old").await.expect("setup");

    // Locked session: rejected before anything is touched.
    assert!(matches!(
        vault.change_password(ALICE, "old", "new").await,
        Err(VaultError::VaultLocked)
    ));

    vault.unlock(ALICE, "old").await.expect("unlock");
    assert!(matches!(
        vault.change_password(ALICE, "wrong", "new").await,
        Err(VaultError::InvalidCredential)
    ));

    // The failed attempts changed nothing.
    vault.lock(ALICE).await;
    vault.unlock(ALICE, "old").await.expect("old password still valid");
}

// ── Mid-flight locking and tampering ─────────────────────────────────────────

#[tokio::test]
async fn lock_during_provider_call_discards_the_result() {
    let provider = Arc::new(FixtureProvider::slow(Duration::from_millis(300)));
    let (vault, _dir) = open_vault(provider.clone()).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"audio").await.expect("capture");

    let task_vault = vault.clone();
    let task_memo = memo_id.clone();
    let transcript_task =
        tokio::spawn(async move { task_vault.request_transcript(&task_memo, ALICE).await });

    // Let the task reach the provider call, then lock the vault under it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    vault.lock(ALICE).await;

    let result = transcript_task.await.expect("join");
    assert!(matches!(result, Err(VaultError::VaultLocked)));

    // The finished transcription was discarded and the memo rolled back.
    vault.unlock(ALICE, "pw").await.expect("re-unlock");
    let listing = vault.list_memos(ALICE).await.expect("list");
    assert_eq!(listing[0].status, MemoStatus::Stored);
    assert!(!listing[0].has_transcript);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);

    // A fresh request succeeds and goes back to the provider.
    vault
        .request_transcript(&memo_id, ALICE)
        .await
        .expect("transcript after re-unlock");
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn tampered_ciphertext_is_decryption_failed() {
    let (vault, dir) = open_vault(Arc::new(FixtureProvider::default())).await;
    vault.setup(ALICE, "pw").await.expect("setup");
    vault.unlock(ALICE, "pw").await.expect("unlock");

    let memo_id = vault.capture(ALICE, b"authentic").await.expect("capture");

    // Overwrite the stored ciphertext behind the vault's back.
    let raw = vv_store::Store::open(&dir.path().join("vault.db"))
        .await
        .expect("raw store");
    sqlx::query("UPDATE memos SET audio_enc = ? WHERE id = ?")
        .bind("A".repeat(64))
        .bind(&memo_id)
        .execute(&raw.pool)
        .await
        .expect("tamper");

    assert!(matches!(
        vault.retrieve(&memo_id, ALICE).await,
        Err(VaultError::DecryptionFailed)
    ));
}
