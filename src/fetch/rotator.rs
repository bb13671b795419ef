//! Randomized route ordering

use crate::url::Route;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};

/// Holds the fixed route pool and hands out a shuffled copy per request
///
/// The pool never changes after construction.
#[derive(Debug, Clone)]
pub struct ProxyRotator {
    pool: Arc<[Route]>,
    /// Seeded generator for reproducible orderings; thread RNG when absent
    seeded: Option<Arc<Mutex<StdRng>>>,
}

impl ProxyRotator {
    /// Creates a rotator drawing from the thread-local RNG
    pub fn new(pool: impl IntoIterator<Item = Route>) -> Self {
        Self {
            pool: pool.into_iter().collect(),
            seeded: None,
        }
    }

    /// Creates a rotator whose sequence of orderings is reproducible
    pub fn with_seed(pool: impl IntoIterator<Item = Route>, seed: u64) -> Self {
        Self {
            pool: pool.into_iter().collect(),
            seeded: Some(Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))),
        }
    }

    /// Builds a rotator from route template strings
    pub fn from_templates<S: AsRef<str>>(templates: &[S]) -> Self {
        Self::new(templates.iter().map(|t| Route::new(t.as_ref())))
    }

    /// Returns a uniformly random permutation of the pool (Fisher-Yates)
    pub fn shuffled_routes(&self) -> Vec<Route> {
        let mut routes = self.pool.to_vec();
        match &self.seeded {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                routes.shuffle(&mut *rng);
            }
            None => routes.shuffle(&mut rand::rng()),
        }
        routes
    }

    /// Returns the routes in their configured order
    pub fn routes(&self) -> &[Route] {
        &self.pool
    }

    /// Number of routes in the pool
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns true if the pool has no routes
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
