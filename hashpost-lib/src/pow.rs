//! Hashcash-style proof-of-work.
//!
//! # Validity rule
//!
//! `digest = SHA-256(data || ascii_decimal(proof))`. A proof is valid when the
//! digest, read as a big-endian 256-bit integer, has at least `bits` leading
//! zero bits. This is the same predicate as `digest < 2^(256 - bits)`.
//! A difficulty above 256 bits can never be met and is rejected.
//!
//! Verification costs one hash; finding a proof costs about `2^bits` hashes.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::MailError;

/// Highest meaningful difficulty.
pub const MAX_BITS: u32 = 256;

/// How many nonces the search tries between checks of the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Proof-of-work errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PowError {
    #[error("difficulty of {0} bits is out of range")]
    DifficultyOutOfRange(u32),
    #[error("proof-of-work search was cancelled")]
    Cancelled,
    #[error("nonce space exhausted")]
    Exhausted,
    #[error("malformed proof-of-work string")]
    Malformed,
}

impl From<PowError> for MailError {
    fn from(err: PowError) -> Self {
        match err {
            PowError::Malformed => MailError::invalid_format("proof_of_work", err.to_string()),
            PowError::DifficultyOutOfRange(_) => MailError::Rejected(err.to_string()),
            PowError::Cancelled | PowError::Exhausted => MailError::Internal(err.to_string()),
        }
    }
}

/// A difficulty, a challenge and (once found) the nonce that satisfies it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWork {
    /// Required leading zero bits.
    pub bits: u32,
    /// Challenge string.
    pub data: String,
    /// Nonce.
    #[serde(default)]
    pub proof: u64,
}

impl ProofOfWork {
    /// Create a proof-of-work with a known nonce.
    pub fn new(bits: u32, data: impl Into<String>, proof: u64) -> Self {
        Self {
            bits,
            data: data.into(),
            proof,
        }
    }

    /// Create an unsolved challenge.
    pub fn without_proof(bits: u32, data: impl Into<String>) -> Self {
        Self::new(bits, data, 0)
    }

    /// Cheap verification predicate.
    pub fn is_valid(&self) -> bool {
        self.bits <= MAX_BITS && meets_difficulty(&self.data, self.proof, self.bits)
    }

    /// Brute-force search from nonce 0 upwards until the proof is valid.
    pub fn work(&mut self) -> Result<(), PowError> {
        self.work_until(&AtomicBool::new(false))
    }

    /// Like [`work`](Self::work), but gives up once `cancel` is raised.
    ///
    /// On cancellation `self.proof` is left untouched.
    pub fn work_until(&mut self, cancel: &AtomicBool) -> Result<(), PowError> {
        if self.bits > MAX_BITS {
            return Err(PowError::DifficultyOutOfRange(self.bits));
        }

        let mut nonce = 0u64;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(PowError::Cancelled);
            }
            if meets_difficulty(&self.data, nonce, self.bits) {
                self.proof = nonce;
                return Ok(());
            }
            nonce = nonce.checked_add(1).ok_or(PowError::Exhausted)?;
        }
    }

    /// Search with `threads` workers over interleaved nonce ranges.
    ///
    /// Returns the smallest proof any worker found first; the result is valid
    /// but not necessarily the globally smallest nonce.
    pub fn work_parallel(&mut self, threads: usize, cancel: &AtomicBool) -> Result<(), PowError> {
        if self.bits > MAX_BITS {
            return Err(PowError::DifficultyOutOfRange(self.bits));
        }
        let threads = threads.max(1) as u64;
        let found = AtomicBool::new(false);
        let winner = AtomicU64::new(u64::MAX);
        let data = self.data.as_str();
        let bits = self.bits;

        std::thread::scope(|scope| {
            for offset in 0..threads {
                let found = &found;
                let winner = &winner;
                scope.spawn(move || {
                    let mut nonce = offset;
                    let mut tries = 0u64;
                    loop {
                        if tries % CANCEL_CHECK_INTERVAL == 0
                            && (found.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed))
                        {
                            return;
                        }
                        if meets_difficulty(data, nonce, bits) {
                            winner.fetch_min(nonce, Ordering::SeqCst);
                            found.store(true, Ordering::SeqCst);
                            return;
                        }
                        nonce = match nonce.checked_add(threads) {
                            Some(n) => n,
                            None => return,
                        };
                        tries += 1;
                    }
                });
            }
        });

        if found.load(Ordering::SeqCst) {
            self.proof = winner.load(Ordering::SeqCst);
            Ok(())
        } else if cancel.load(Ordering::Relaxed) {
            Err(PowError::Cancelled)
        } else {
            Err(PowError::Exhausted)
        }
    }

    /// Solve on a blocking worker, abandoning the search after `timeout`.
    ///
    /// A timed out search is reported as [`MailError::Timeout`]; the worker
    /// notices the cancel flag and exits on its own.
    pub async fn solve_with_timeout(
        bits: u32,
        data: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let mut work = Self::without_proof(bits, data);
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            work.work_until(&worker_cancel).map(|_| work)
        });

        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => joined
                .map_err(|e| MailError::Internal(format!("proof-of-work worker failed: {e}")))?
                .map_err(MailError::from),
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                Err(MailError::Timeout {
                    operation: "proof_of_work".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Textual form `bits$base64(data)$proof`.
impl fmt::Display for ProofOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}${}", self.bits, BASE64.encode(&self.data), self.proof)
    }
}

impl FromStr for ProofOfWork {
    type Err = PowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('$');
        let (Some(bits), Some(data), Some(proof), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PowError::Malformed);
        };

        let bits = bits.parse::<u32>().map_err(|_| PowError::Malformed)?;
        let data = BASE64.decode(data).map_err(|_| PowError::Malformed)?;
        let data = String::from_utf8(data).map_err(|_| PowError::Malformed)?;
        let proof = proof.parse::<u64>().map_err(|_| PowError::Malformed)?;

        Ok(Self { bits, data, proof })
    }
}

/// Count the leading zero bits of a digest.
pub fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut count = 0;
    for byte in digest {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

fn pow_digest(data: &str, nonce: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hasher.finalize().into()
}

fn meets_difficulty(data: &str, nonce: u64, bits: u32) -> bool {
    bits == 0 || leading_zero_bits(&pow_digest(data, nonce)) >= bits
}
