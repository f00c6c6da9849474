//! Read-through roster cache
//!
//! Rosters change rarely during a competition, so they are kept for a
//! configurable time after being fetched. A failed fetch leaves the cache
//! untouched; the caller retries by asking again.

use std::{collections::HashMap, time::Duration};

use web_time::SystemTime;

use super::Error;
use crate::participant::Student;

/// Anything rosters can be fetched from
pub trait RosterSource {
    /// Fetches the students of a college
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown college, [`Error::Unavailable`]
    /// if the source cannot be reached.
    fn fetch_roster(&self, college_name: &str) -> Result<Vec<Student>, Error>;
}

#[derive(Debug, Clone)]
struct CachedRoster {
    students: Vec<Student>,
    fetched_at: SystemTime,
}

/// Caches rosters from a [`RosterSource`] for a fixed lifetime
#[derive(Debug)]
pub struct RosterCache<R> {
    source: R,
    ttl: Duration,
    entries: HashMap<String, CachedRoster>,
}

impl<R: RosterSource> RosterCache<R> {
    /// Creates an empty cache in front of `source`
    pub fn new(source: R, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: HashMap::new(),
        }
    }

    /// The wrapped source
    pub fn source(&self) -> &R {
        &self.source
    }

    /// Mutable access to the wrapped source; cached entries are kept
    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Whether a fresh entry for `college_name` exists at `now`
    pub fn is_fresh_at(&self, college_name: &str, now: SystemTime) -> bool {
        self.entries.get(college_name).is_some_and(|entry| {
            now.duration_since(entry.fetched_at)
                .is_ok_and(|age| age < self.ttl)
        })
    }

    /// Returns the roster, fetching it if missing or expired
    ///
    /// # Errors
    ///
    /// Propagates the source's error; the cache is left unchanged.
    pub fn get(&mut self, college_name: &str) -> Result<Vec<Student>, Error> {
        self.get_at(college_name, SystemTime::now())
    }

    /// [`RosterCache::get`] with an explicit clock reading
    ///
    /// # Errors
    ///
    /// Propagates the source's error; the cache is left unchanged.
    pub fn get_at(&mut self, college_name: &str, now: SystemTime) -> Result<Vec<Student>, Error> {
        if self.is_fresh_at(college_name, now) {
            if let Some(entry) = self.entries.get(college_name) {
                return Ok(entry.students.clone());
            }
        } else if self.entries.contains_key(college_name) {
            log::debug!("roster for {college_name} expired");
        }

        self.refresh_at(college_name, now)
    }

    /// Fetches the roster again regardless of age
    ///
    /// # Errors
    ///
    /// Propagates the source's error; the cache is left unchanged.
    pub fn refresh(&mut self, college_name: &str) -> Result<Vec<Student>, Error> {
        self.refresh_at(college_name, SystemTime::now())
    }

    fn refresh_at(&mut self, college_name: &str, now: SystemTime) -> Result<Vec<Student>, Error> {
        let students = self.source.fetch_roster(college_name).inspect_err(|e| {
            log::warn!("could not load roster for {college_name}: {e}");
        })?;

        self.entries.insert(
            college_name.to_owned(),
            CachedRoster {
                students: students.clone(),
                fetched_at: now,
            },
        );
        Ok(students)
    }

    /// Drops every cached roster
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct CountingSource {
        calls: Cell<usize>,
        available: Cell<bool>,
    }

    impl RosterSource for CountingSource {
        fn fetch_roster(&self, college_name: &str) -> Result<Vec<Student>, Error> {
            if !self.available.get() {
                return Err(Error::Unavailable("offline".to_owned()));
            }
            self.calls.set(self.calls.get() + 1);
            Ok(vec![Student {
                name: format!("{college_name} student {}", self.calls.get()),
                roll_no: "1".to_owned(),
            }])
        }
    }

    fn cache() -> RosterCache<CountingSource> {
        RosterCache::new(
            CountingSource {
                calls: Cell::new(0),
                available: Cell::new(true),
            },
            Duration::from_secs(30 * 60),
        )
    }

    #[test]
    fn test_hits_within_ttl() {
        let mut cache = cache();
        let start = SystemTime::now();
        let first = cache.get_at("X", start).unwrap();
        let second = cache
            .get_at("X", start + Duration::from_secs(29 * 60))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.source().calls.get(), 1);
    }

    #[test]
    fn test_expires_after_ttl() {
        let mut cache = cache();
        let start = SystemTime::now();
        cache.get_at("X", start).unwrap();
        assert!(!cache.is_fresh_at("X", start + Duration::from_secs(30 * 60)));
        cache
            .get_at("X", start + Duration::from_secs(31 * 60))
            .unwrap();
        assert_eq!(cache.source().calls.get(), 2);
    }

    #[test]
    fn test_refresh_and_clear() {
        let mut cache = cache();
        cache.get("X").unwrap();
        cache.refresh("X").unwrap();
        assert_eq!(cache.source().calls.get(), 2);

        cache.clear();
        assert!(!cache.is_fresh_at("X", SystemTime::now()));
    }

    #[test]
    fn test_failure_leaves_cache_unchanged() {
        let mut cache = cache();
        let start = SystemTime::now();
        let cached = cache.get_at("X", start).unwrap();

        cache.source_mut().available.set(false);
        assert!(cache.refresh("X").is_err());
        assert!(cache.get_at("Y", start).is_err());
        assert_eq!(cache.get_at("X", start).unwrap(), cached);

        cache.source_mut().available.set(true);
        assert!(cache.get_at("Y", start).is_ok());
    }
}
