//! Pairing Manager: challenge-response handshake plus persistent credential
//! store. Grounded on `original_source/agent/security/pairing.py`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use remote_agent_common::error::{AgentError, AgentResult};
use remote_agent_common::helpers::fs::{secure_directory, secure_file};
use remote_agent_common::helpers::hash::{generate_token, hash_token, verify_token as sha256_matches};
use remote_agent_common::model::{ClientId, PairedClient, PairingState, PendingPairing};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const CHALLENGE_LENGTH_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialStoreFile {
    clients: HashMap<ClientId, PairedClient>,
}

struct Inner {
    paired: HashMap<ClientId, PairedClient>,
    pending: HashMap<ClientId, PendingPairing>,
}

pub struct PairingManager {
    inner: Mutex<Inner>,
    store_path: PathBuf,
    challenge_ttl: ChronoDuration,
    lan_mode: bool,
    lan_mode_allow_signature_bypass: bool,
}

/// Outcome of `request_pairing`.
pub struct PairingRequestOutcome {
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
    pub auto_approved: bool,
}

/// Outcome of `confirm_pairing`.
pub struct PairingConfirmOutcome {
    pub token: String,
    pub client_id: ClientId,
}

impl PairingManager {
    /// Loads the credential store from `store_dir/clients.json`. A missing
    /// or corrupt file produces an empty store, matching the original's
    /// "corrupt or missing files produce an empty store" contract.
    pub async fn load(
        store_dir: impl AsRef<Path>,
        challenge_ttl_secs: u64,
        lan_mode: bool,
        lan_mode_allow_signature_bypass: bool,
    ) -> AgentResult<Self> {
        let store_dir = store_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&store_dir).await?;
        secure_directory(&store_dir)?;
        let store_path = store_dir.join("clients.json");

        let paired = match tokio::fs::read(&store_path).await {
            Ok(bytes) => match serde_json::from_slice::<CredentialStoreFile>(&bytes) {
                Ok(file) => file.clients,
                Err(e) => {
                    warn!(error = %e, "credential store corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                paired,
                pending: HashMap::new(),
            }),
            store_path,
            challenge_ttl: ChronoDuration::seconds(challenge_ttl_secs as i64),
            lan_mode,
            lan_mode_allow_signature_bypass,
        })
    }

    async fn persist(&self, paired: &HashMap<ClientId, PairedClient>) -> AgentResult<()> {
        let file = CredentialStoreFile {
            clients: paired.clone(),
        };
        let body = serde_json::to_vec_pretty(&file)?;
        let tmp_path = self.store_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &body).await?;
        secure_file(&tmp_path)?;
        tokio::fs::rename(&tmp_path, &self.store_path).await?;
        Ok(())
    }

    pub async fn request_pairing(
        &self,
        client_id: ClientId,
        client_name: String,
        public_key_pem: String,
    ) -> AgentResult<PairingRequestOutcome> {
        if RsaPublicKey::from_public_key_pem(&public_key_pem).is_err() {
            return Err(AgentError::InvalidArgument(
                "unparseable public key".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;
        // Re-pairing discards the prior record before issuing a fresh challenge.
        inner.pending.remove(&client_id);

        let mut bytes = [0u8; CHALLENGE_LENGTH_BYTES];
        rand::thread_rng().fill(&mut bytes[..]);
        let challenge = data_encoding::HEXLOWER.encode(&bytes);
        let created_at = Utc::now();
        let expires_at = created_at + self.challenge_ttl;
        let auto_approved = self.lan_mode;

        let state = if auto_approved {
            PairingState::Approved
        } else {
            PairingState::Pending
        };

        inner.pending.insert(
            client_id.clone(),
            PendingPairing {
                client_id,
                client_name,
                public_key_pem,
                challenge: challenge.clone(),
                created_at,
                expires_at,
                state,
            },
        );

        Ok(PairingRequestOutcome {
            challenge,
            expires_at,
            auto_approved,
        })
    }

    /// `approve` is the out-of-band callback invoked synchronously outside
    /// LAN mode when the pending record is still `Pending`; it returns
    /// `true` to approve, `false` to reject.
    pub async fn confirm_pairing(
        &self,
        client_id: &str,
        signature_bytes: &[u8],
        approve: impl FnOnce() -> bool,
    ) -> AgentResult<PairingConfirmOutcome> {
        let mut inner = self.inner.lock().await;

        let pending = match inner.pending.get(client_id) {
            Some(p) => p.clone(),
            None => return Err(AgentError::Unauthenticated),
        };

        if Utc::now() > pending.expires_at {
            inner.pending.remove(client_id);
            return Err(AgentError::Unauthenticated);
        }

        if pending.state == PairingState::Pending {
            if approve() {
                inner.pending.get_mut(client_id).expect("just checked").state =
                    PairingState::Approved;
            } else {
                inner.pending.get_mut(client_id).expect("just checked").state =
                    PairingState::Rejected;
            }
        }

        let pending = inner.pending.get(client_id).expect("just checked").clone();
        if pending.state != PairingState::Approved {
            inner.pending.remove(client_id);
            return Err(AgentError::Unauthenticated);
        }

        let signature_ok = verify_signature(&pending.public_key_pem, &pending.challenge, signature_bytes);
        if !signature_ok && !(self.lan_mode && self.lan_mode_allow_signature_bypass) {
            return Err(AgentError::Unauthenticated);
        }

        let token = generate_token();
        let token_hash = hash_token(token.expose_secret());

        let record = PairedClient {
            client_id: pending.client_id.clone(),
            client_name: pending.client_name.clone(),
            public_key_pem: pending.public_key_pem.clone(),
            token_hash,
            paired_at: Utc::now(),
        };
        inner.paired.insert(pending.client_id.clone(), record);
        inner.pending.remove(client_id);

        let paired_snapshot = inner.paired.clone();
        drop(inner);
        self.persist(&paired_snapshot).await?;

        info!(client_id = %pending.client_id, "pairing confirmed");

        Ok(PairingConfirmOutcome {
            token: token.expose_secret().clone(),
            client_id: pending.client_id,
        })
    }

    /// Out-of-band operator approval for a `Pending` request, mirroring
    /// `PairingManager.approve_request` in `original_source`. Returns `false`
    /// if there's no matching `Pending` record.
    pub async fn approve_request(&self, client_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.pending.get_mut(client_id) {
            Some(pending) if pending.state == PairingState::Pending => {
                pending.state = PairingState::Approved;
                true
            }
            _ => false,
        }
    }

    /// Out-of-band operator rejection for a `Pending` request.
    pub async fn reject_request(&self, client_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.pending.get_mut(client_id) {
            Some(pending) if pending.state == PairingState::Pending => {
                pending.state = PairingState::Rejected;
                true
            }
            _ => false,
        }
    }

    pub async fn verify_token(&self, token: &str) -> Option<ClientId> {
        let inner = self.inner.lock().await;
        inner
            .paired
            .values()
            .find(|c| sha256_matches(token, &c.token_hash))
            .map(|c| c.client_id.clone())
    }

    pub async fn unpair(&self, client_id: &str) -> AgentResult<bool> {
        let mut inner = self.inner.lock().await;
        let removed = inner.paired.remove(client_id).is_some();
        if removed {
            let snapshot = inner.paired.clone();
            drop(inner);
            self.persist(&snapshot).await?;
        }
        Ok(removed)
    }

    pub async fn list_paired(&self) -> Vec<PairedClient> {
        self.inner.lock().await.paired.values().cloned().collect()
    }

    pub async fn get_client(&self, client_id: &str) -> Option<PairedClient> {
        self.inner.lock().await.paired.get(client_id).cloned()
    }
}

fn verify_signature(public_key_pem: &str, challenge_hex: &str, signature_bytes: &[u8]) -> bool {
    let Ok(public_key) = RsaPublicKey::from_public_key_pem(public_key_pem) else {
        return false;
    };
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let Ok(signature) = Signature::try_from(signature_bytes) else {
        return false;
    };
    verifying_key
        .verify(challenge_hex.as_bytes(), &signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::signature::{RandomizedSigner, SignatureEncoding};
    use rsa::RsaPrivateKey;

    fn generate_keypair() -> (RsaPrivateKey, String) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private_key, public_pem)
    }

    #[tokio::test]
    async fn pair_and_verify_round_trip() {
        let dir = tempdir();
        let manager = PairingManager::load(&dir, 300, false, false).await.unwrap();
        let (private_key, public_pem) = generate_keypair();

        let req = manager
            .request_pairing("c-1".to_string(), "laptop".to_string(), public_pem)
            .await
            .unwrap();
        assert!(!req.auto_approved);
        assert_eq!(req.challenge.len(), 64);

        let signing_key = SigningKey::<Sha256>::new(private_key);
        let signature = signing_key
            .sign_with_rng(&mut rand::thread_rng(), req.challenge.as_bytes());

        let confirm = manager
            .confirm_pairing("c-1", &signature.to_bytes(), || true)
            .await
            .unwrap();
        assert_eq!(confirm.client_id, "c-1");
        assert_eq!(confirm.token.len(), 64);

        let verified = manager.verify_token(&confirm.token).await;
        assert_eq!(verified.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn lan_mode_auto_approves() {
        let dir = tempdir();
        let manager = PairingManager::load(&dir, 300, true, true).await.unwrap();
        let (_private_key, public_pem) = generate_keypair();
        let req = manager
            .request_pairing("c-2".to_string(), "phone".to_string(), public_pem)
            .await
            .unwrap();
        assert!(req.auto_approved);

        // LAN mode with signature bypass tolerates a bogus signature.
        let confirm = manager
            .confirm_pairing("c-2", b"not-a-real-signature", || true)
            .await
            .unwrap();
        assert_eq!(confirm.client_id, "c-2");
    }

    #[tokio::test]
    async fn repairing_discards_prior_pending() {
        let dir = tempdir();
        let manager = PairingManager::load(&dir, 300, true, true).await.unwrap();
        let (_k, pem) = generate_keypair();
        let first = manager
            .request_pairing("c-3".to_string(), "n".to_string(), pem.clone())
            .await
            .unwrap();
        let second = manager
            .request_pairing("c-3".to_string(), "n".to_string(), pem)
            .await
            .unwrap();
        assert_ne!(first.challenge, second.challenge);
    }

    fn tempdir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("remote-agent-test-{}", uuid::Uuid::new_v4()));
        p
    }
}
