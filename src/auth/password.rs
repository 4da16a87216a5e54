use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

// Fixed work factor: Argon2id, 19 MiB, 2 passes, 1 lane.
const MEMORY_KIB: u32 = 19 * 1024;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

lazy_static! {
    /// Hash verified against when the login handle is unknown, so both
    /// failure paths do the same amount of work.
    static ref DUMMY_HASH: Option<String> = hash_password("authgate-dummy-password").ok();
}

fn hasher() -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    // Cost parameters are read from the PHC string itself.
    Ok(hasher()?
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Hashes on the blocking pool so the request runtime isn't stalled.
pub async fn hash(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

/// Runs one verification against `hash` purely for its cost. Returns
/// whether the work was actually done.
fn pad_verification(hash: Option<&str>, plain: &str) -> bool {
    let Some(hash) = hash else {
        warn!("dummy hash unavailable; unknown-login path is not timing padded");
        return false;
    };
    match verify_password(plain, hash) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "dummy verification failed");
            false
        }
    }
}

/// Burns one verification's worth of CPU for logins with an unknown handle.
pub async fn verify_dummy(plain: String) {
    // The first call also computes the dummy hash, so keep it off the runtime.
    let padded = tokio::task::spawn_blocking(move || {
        pad_verification(DUMMY_HASH.as_deref(), &plain)
    })
    .await;
    if let Err(e) = padded {
        warn!(error = %e, "dummy verification task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_is_salted_argon2id_phc() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b, "each hash gets a fresh salt");
        for h in [&a, &b] {
            assert!(h.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
            assert!(!h.contains("secret"));
            assert!(verify_password("secret", h).unwrap());
        }
    }

    #[test]
    fn only_the_exact_password_matches() {
        let stored = hash_password("Dupont-2024").unwrap();
        for attempt in ["dupont-2024", "Dupont-2024 ", "", "Dupont"] {
            assert!(!verify_password(attempt, &stored).unwrap(), "{attempt:?}");
        }
    }

    #[test]
    fn corrupt_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("secret", "plaintext-secret").is_err());
        assert!(verify_password("secret", "").is_err());
    }

    #[tokio::test]
    async fn async_wrappers_run_on_blocking_pool() {
        let stored = hash("secret".to_string()).await.unwrap();
        assert!(verify("secret".to_string(), stored.clone()).await.unwrap());
        assert!(!verify("nope".to_string(), stored).await.unwrap());
    }

    #[test]
    fn padding_runs_against_the_dummy_hash() {
        assert!(DUMMY_HASH.is_some());
        assert!(pad_verification(DUMMY_HASH.as_deref(), "whatever"));
    }

    #[test]
    fn padding_reports_when_it_could_not_run() {
        assert!(!pad_verification(None, "whatever"));
        assert!(!pad_verification(Some("not-a-phc-string"), "whatever"));
    }

    #[tokio::test]
    async fn dummy_verification_completes() {
        verify_dummy("authgate-dummy-password".to_string()).await;
    }
}
