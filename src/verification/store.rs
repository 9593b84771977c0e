use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct PendingCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingCode {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

/// Result of checking a submitted code against the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Mismatch,
    Expired,
    Missing,
}

/// Pending one-time codes keyed by normalized phone.
pub trait OtpStore: Send + Sync {
    fn put(&self, phone: &str, code: String, issued_at: DateTime<Utc>);

    /// Expired entries are evicted by this call whatever the submitted code.
    fn check(&self, phone: &str, code: &str, now: DateTime<Utc>) -> CodeCheck;

    /// Like `check`, but a valid code is removed in the same step so that
    /// concurrent callers cannot both accept it.
    fn take(&self, phone: &str, code: &str, now: DateTime<Utc>) -> CodeCheck;

    fn remove(&self, phone: &str) -> bool;

    fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    fn contains(&self, phone: &str) -> bool;
}

pub struct MemoryOtpStore {
    codes: DashMap<String, PendingCode>,
    ttl: Duration,
}

impl MemoryOtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
        }
    }
}

impl MemoryOtpStore {
    fn evict_expired(&self, phone: &str, now: DateTime<Utc>) -> bool {
        let ttl = self.ttl;
        self.codes
            .remove_if(phone, |_, pending| pending.is_expired(now, ttl))
            .is_some()
    }
}

impl OtpStore for MemoryOtpStore {
    fn put(&self, phone: &str, code: String, issued_at: DateTime<Utc>) {
        self.codes
            .insert(phone.to_string(), PendingCode { code, issued_at });
    }

    fn check(&self, phone: &str, code: &str, now: DateTime<Utc>) -> CodeCheck {
        if self.evict_expired(phone, now) {
            return CodeCheck::Expired;
        }

        match self.codes.get(phone) {
            None => CodeCheck::Missing,
            Some(pending) if pending.code == code => CodeCheck::Valid,
            Some(_) => CodeCheck::Mismatch,
        }
    }

    fn take(&self, phone: &str, code: &str, now: DateTime<Utc>) -> CodeCheck {
        if self.evict_expired(phone, now) {
            return CodeCheck::Expired;
        }

        let ttl = self.ttl;
        let taken = self.codes.remove_if(phone, |_, pending| {
            !pending.is_expired(now, ttl) && pending.code == code
        });
        match taken {
            Some(_) => CodeCheck::Valid,
            None if self.codes.contains_key(phone) => CodeCheck::Mismatch,
            None => CodeCheck::Missing,
        }
    }

    fn remove(&self, phone: &str) -> bool {
        self.codes.remove(phone).is_some()
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.codes.len();
        let ttl = self.ttl;
        self.codes.retain(|_, pending| !pending.is_expired(now, ttl));
        before.saturating_sub(self.codes.len())
    }

    fn contains(&self, phone: &str) -> bool {
        self.codes.contains_key(phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONE: &str = "+79991234567";

    fn store() -> MemoryOtpStore {
        MemoryOtpStore::new(Duration::minutes(5))
    }

    #[test]
    fn test_check_matches_exactly() {
        let store = store();
        let now = Utc::now();
        store.put(PHONE, "0421".to_string(), now);

        assert_eq!(store.check(PHONE, "421", now), CodeCheck::Mismatch);
        assert_eq!(store.check(PHONE, "0421 ", now), CodeCheck::Mismatch);
        assert_eq!(store.check(PHONE, "0421", now), CodeCheck::Valid);
        // success does not consume the code
        assert!(store.contains(PHONE));
    }

    #[test]
    fn test_missing_phone() {
        let store = store();
        assert_eq!(store.check(PHONE, "1234", Utc::now()), CodeCheck::Missing);
    }

    #[test]
    fn test_ttl_boundary_is_inclusive() {
        let store = store();
        let issued = Utc::now();
        store.put(PHONE, "1234".to_string(), issued);

        let at_limit = issued + Duration::minutes(5);
        assert_eq!(store.check(PHONE, "1234", at_limit), CodeCheck::Valid);

        let past_limit = at_limit + Duration::seconds(1);
        assert_eq!(store.check(PHONE, "9999", past_limit), CodeCheck::Expired);
        assert!(!store.contains(PHONE));
        assert_eq!(store.check(PHONE, "1234", past_limit), CodeCheck::Missing);
    }

    #[test]
    fn test_put_overwrites_pending_code() {
        let store = store();
        let now = Utc::now();
        store.put(PHONE, "1111".to_string(), now);
        store.put(PHONE, "2222".to_string(), now);

        assert_eq!(store.check(PHONE, "1111", now), CodeCheck::Mismatch);
        assert_eq!(store.check(PHONE, "2222", now), CodeCheck::Valid);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = store();
        store.put(PHONE, "1234".to_string(), Utc::now());
        assert!(store.remove(PHONE));
        assert!(!store.remove(PHONE));
    }

    #[test]
    fn test_purge_only_drops_expired() {
        let store = store();
        let now = Utc::now();
        store.put("+79990000001", "1".to_string(), now - Duration::minutes(10));
        store.put("+79990000002", "2".to_string(), now - Duration::minutes(6));
        store.put("+79990000003", "3".to_string(), now);

        assert_eq!(store.purge_expired(now), 2);
        assert!(store.contains("+79990000003"));
        assert!(!store.contains("+79990000001"));
    }

    #[test]
    fn test_take_removes_only_valid_code() {
        let store = store();
        let now = Utc::now();
        store.put(PHONE, "1234".to_string(), now);

        assert_eq!(store.take(PHONE, "9999", now), CodeCheck::Mismatch);
        assert!(store.contains(PHONE));
        assert_eq!(store.take(PHONE, "1234", now), CodeCheck::Valid);
        assert!(!store.contains(PHONE));
        assert_eq!(store.take(PHONE, "1234", now), CodeCheck::Missing);
    }

    #[test]
    fn test_take_evicts_expired_code() {
        let store = store();
        let issued = Utc::now();
        store.put(PHONE, "1234".to_string(), issued);

        let late = issued + Duration::minutes(5) + Duration::seconds(1);
        assert_eq!(store.take(PHONE, "1234", late), CodeCheck::Expired);
        assert!(!store.contains(PHONE));
    }

    #[test]
    fn test_concurrent_take_accepts_code_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Barrier;

        const THREADS: usize = 8;

        for _ in 0..50 {
            let store = store();
            let now = Utc::now();
            store.put(PHONE, "1234".to_string(), now);
            let barrier = Barrier::new(THREADS);
            let accepted = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..THREADS {
                    scope.spawn(|| {
                        barrier.wait();
                        if store.take(PHONE, "1234", now) == CodeCheck::Valid {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(accepted.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_phones_are_independent() {
        let store = store();
        let now = Utc::now();
        store.put("+79990000001", "1111".to_string(), now);
        store.put("+79990000002", "2222".to_string(), now);
        store.remove("+79990000001");

        assert_eq!(store.check("+79990000002", "2222", now), CodeCheck::Valid);
    }
}
