//! Per-user map state.
//!
//! The reference point, radius and eligibility mode live in one immutable
//! [`SessionContext`]. Every user action swaps in a whole new context, so a
//! reader always sees a consistent triple.
//!
//! Location lookups can finish after the user has moved on. Each lookup
//! takes a [`ResolutionTicket`] stamped with the current generation, and its
//! result is applied only if no newer reference-point action happened since.

use crate::core::distance::DistanceUnit;
use crate::core::graph::EligibilityMode;
use crate::models::ReferencePoint;
use std::sync::{Arc, Mutex, MutexGuard};

/// Immutable snapshot of the inputs to visibility and graph computation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub reference: Option<ReferencePoint>,
    pub radius: Option<f64>,
    pub unit: DistanceUnit,
    pub mode: EligibilityMode,
}

impl SessionContext {
    pub fn new(radius: Option<f64>, unit: DistanceUnit) -> Self {
        Self {
            reference: None,
            radius,
            unit,
            mode: EligibilityMode::default(),
        }
    }
}

/// Proof that a location lookup was started at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
}

impl ResolutionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct SessionState {
    context: Arc<SessionContext>,
    generation: u64,
    ip_fallback_offered: bool,
}

/// A user's map session
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(context: SessionContext) -> Self {
        Self {
            state: Mutex::new(SessionState {
                context: Arc::new(context),
                generation: 0,
                ip_fallback_offered: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // The state is replaced wholesale, so a poisoned lock still holds a valid value
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current context; callers keep it for a whole recompute
    pub fn context(&self) -> Arc<SessionContext> {
        self.lock().context.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn ip_fallback_offered(&self) -> bool {
        self.lock().ip_fallback_offered
    }

    /// Start a location lookup, invalidating any lookup still in flight
    pub fn begin_resolution(&self) -> ResolutionTicket {
        let mut state = self.lock();
        state.generation += 1;
        ResolutionTicket {
            generation: state.generation,
        }
    }

    /// Apply a resolved point if the ticket is still current
    ///
    /// Returns `false` and leaves the session untouched for a stale ticket.
    pub fn apply_resolution(&self, ticket: ResolutionTicket, reference: ReferencePoint) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.generation {
            tracing::debug!(
                "Discarding stale location (ticket {}, current {})",
                ticket.generation,
                state.generation
            );
            return false;
        }

        let next = SessionContext {
            reference: Some(reference),
            ..(*state.context).clone()
        };
        state.context = Arc::new(next);
        state.ip_fallback_offered = false;
        true
    }

    /// Note a failed device lookup so the IP estimate may be offered
    ///
    /// Ignored for a stale ticket.
    pub fn record_device_failure(&self, ticket: ResolutionTicket) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.generation {
            return false;
        }
        state.ip_fallback_offered = true;
        true
    }

    /// Consume the IP fallback offer; only the first caller gets it
    pub fn take_ip_fallback(&self) -> Option<ResolutionTicket> {
        let mut state = self.lock();
        if !state.ip_fallback_offered {
            return None;
        }
        state.ip_fallback_offered = false;
        state.generation += 1;
        Some(ResolutionTicket {
            generation: state.generation,
        })
    }

    /// Drop the reference point and abandon any lookup in flight
    pub fn clear_reference(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.ip_fallback_offered = false;
        let next = SessionContext {
            reference: None,
            ..(*state.context).clone()
        };
        state.context = Arc::new(next);
    }

    pub fn set_radius(&self, radius: Option<f64>) {
        self.replace(|context| SessionContext { radius, ..context });
    }

    pub fn set_unit(&self, unit: DistanceUnit) {
        self.replace(|context| SessionContext { unit, ..context });
    }

    pub fn set_mode(&self, mode: EligibilityMode) {
        self.replace(|context| SessionContext { mode, ..context });
    }

    fn replace(&self, update: impl FnOnce(SessionContext) -> SessionContext) {
        let mut state = self.lock();
        let next = update((*state.context).clone());
        state.context = Arc::new(next);
    }
}
