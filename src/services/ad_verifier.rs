use crate::error::{AppError, AppResult};
use crate::flows::VerificationQuestion;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of checking a verification answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Answer accepted; the proof token can be redeemed for one ticket
    Passed { proof: String },
    Failed { reason: String },
}

/// Ad-view verification capability
#[allow(async_fn_in_trait)]
pub trait AdVerifier {
    /// Question to ask once the ad for `session_id` finished playing
    async fn issue_question(&self, session_id: Uuid) -> AppResult<VerificationQuestion>;

    /// Check the chosen option; each issued question can be answered once
    async fn check_answer(
        &self,
        session_id: Uuid,
        question_id: &str,
        answer: usize,
    ) -> AppResult<VerificationOutcome>;

    /// Whether `proof` was minted by this verifier and not yet revoked
    async fn is_valid_proof(&self, proof: &str) -> bool;

    /// Forget a proof once it has been redeemed (or can no longer be)
    async fn revoke_proof(&self, proof: &str);

    /// Drop everything held for a session that will not continue
    async fn discard_session(&self, session_id: Uuid);
}

struct QuizQuestion {
    id: &'static str,
    prompt: &'static str,
    options: &'static [&'static str],
    correct: usize,
}

const QUESTION_BANK: &[QuizQuestion] = &[
    QuizQuestion {
        id: "brand_color",
        prompt: "What was the main color of the advertised brand?",
        options: &["Red", "Blue", "Purple", "Green"],
        correct: 2,
    },
    QuizQuestion {
        id: "product_type",
        prompt: "What kind of product was advertised?",
        options: &["Mobile app", "Sports shoes", "Coffee", "Car insurance"],
        correct: 0,
    },
    QuizQuestion {
        id: "call_to_action",
        prompt: "What did the ad ask you to do?",
        options: &["Call now", "Download today", "Visit a store", "Subscribe by mail"],
        correct: 1,
    },
    QuizQuestion {
        id: "ad_length",
        prompt: "Roughly how long was the ad?",
        options: &["5 seconds", "30 seconds", "2 minutes", "10 minutes"],
        correct: 1,
    },
];

#[derive(Debug, Default)]
struct QuizSession {
    /// Questions issued so far; each retry gets the next one in the bank
    attempts: usize,
    /// Index of the question awaiting an answer
    pending: Option<usize>,
}

/// Verifier serving canned multiple-choice questions
pub struct QuizAdVerifier {
    sessions: RwLock<HashMap<Uuid, QuizSession>>,
    minted: RwLock<HashSet<String>>,
    secret: String,
}

impl QuizAdVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            minted: RwLock::new(HashSet::new()),
            secret: secret.into(),
        }
    }

    /// Sessions with verification state still held
    pub async fn tracked_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Proofs minted and not yet revoked
    pub async fn outstanding_proofs(&self) -> usize {
        self.minted.read().await.len()
    }

    /// Index of the correct option for `question_id`
    pub fn correct_answer(question_id: &str) -> Option<usize> {
        QUESTION_BANK
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.correct)
    }

    fn mint_proof(&self, session_id: Uuid, attempt: usize, question_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(session_id.as_bytes());
        hasher.update((attempt as u64).to_be_bytes());
        hasher.update(question_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl AdVerifier for QuizAdVerifier {
    async fn issue_question(&self, session_id: Uuid) -> AppResult<VerificationQuestion> {
        let index = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.entry(session_id).or_default();
            let first = (session_id.as_u128() % QUESTION_BANK.len() as u128) as usize;
            let index = (first + session.attempts) % QUESTION_BANK.len();
            session.attempts += 1;
            session.pending = Some(index);
            index
        };
        let question = &QUESTION_BANK[index];
        debug!("Issued question {} for ad session {}", question.id, session_id);

        Ok(VerificationQuestion {
            id: question.id.to_string(),
            prompt: question.prompt.to_string(),
            options: question.options.iter().map(|o| o.to_string()).collect(),
        })
    }

    async fn check_answer(
        &self,
        session_id: Uuid,
        question_id: &str,
        answer: usize,
    ) -> AppResult<VerificationOutcome> {
        let (index, attempt) = self
            .sessions
            .write()
            .await
            .get_mut(&session_id)
            .and_then(|s| s.pending.take().map(|index| (index, s.attempts)))
            .ok_or_else(|| AppError::NotFound(format!("No question pending for session {}", session_id)))?;

        let question = &QUESTION_BANK[index];
        if question.id != question_id {
            return Err(AppError::Validation(format!(
                "Question {} was not issued to session {}",
                question_id, session_id
            )));
        }
        if answer >= question.options.len() {
            return Err(AppError::Validation(format!("Answer {} is not an option", answer)));
        }

        if answer != question.correct {
            info!("Ad session {} failed verification", session_id);
            return Ok(VerificationOutcome::Failed {
                reason: "Incorrect answer. Please watch the full ad and try again.".to_string(),
            });
        }

        let proof = self.mint_proof(session_id, attempt, question_id);
        self.minted.write().await.insert(proof.clone());
        info!("Ad session {} verified", session_id);
        Ok(VerificationOutcome::Passed { proof })
    }

    async fn is_valid_proof(&self, proof: &str) -> bool {
        self.minted.read().await.contains(proof)
    }

    async fn revoke_proof(&self, proof: &str) {
        self.minted.write().await.remove(proof);
    }

    async fn discard_session(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }
}
