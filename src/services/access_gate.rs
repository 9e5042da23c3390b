//! src/services/access_gate.rs
//!
//! AccessGate — allow-list authorization evaluated before any upload work.
//! Decisions depend on caller identity alone; payload bytes are never needed.

use crate::models::caller::{AuthorizationSet, CallerId};
use tracing::{error, info, warn};

/// Characters of request metadata kept in a denial audit record.
const PREVIEW_CHARS: usize = 50;

#[derive(Clone, Debug)]
pub struct AccessGate {
    allowed: AuthorizationSet,
}

impl AccessGate {
    pub fn new(allowed: AuthorizationSet) -> Self {
        if allowed.is_empty() {
            warn!("caller allow-list is empty - every request will be rejected");
        }
        Self { allowed }
    }

    /// Build the gate from the raw configured list.
    ///
    /// Absent or blank configuration yields a deny-all gate. Malformed entries
    /// are logged and skipped; this never fails.
    pub fn from_config(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            warn!(
                "allowed callers not configured - denying all requests; \
                 set MEDIA_DROP_ALLOWED_CALLERS to a comma separated list of caller ids"
            );
            return Self {
                allowed: AuthorizationSet::default(),
            };
        };

        let parsed = AuthorizationSet::parse(raw);
        if !parsed.malformed.is_empty() {
            error!(
                malformed = ?parsed.malformed,
                kept = parsed.set.len(),
                "failed to parse some allowed caller entries"
            );
        }
        info!(
            callers = parsed.set.len(),
            "caller allow-list configured"
        );
        Self::new(parsed.set)
    }

    /// Binary decision for `caller`, with an audit record.
    pub fn authorize(&self, caller: CallerId) -> bool {
        self.decide(caller, None)
    }

    /// Like [`authorize`](Self::authorize), attaching a short preview of the
    /// request metadata to a denial record.
    pub fn authorize_with_preview(&self, caller: CallerId, preview: &str) -> bool {
        self.decide(caller, Some(preview))
    }

    fn decide(&self, caller: CallerId, preview: Option<&str>) -> bool {
        let allowed = self.allowed.contains(caller);
        if allowed {
            info!(caller = %caller, "caller admitted");
        } else {
            let preview: String = preview
                .unwrap_or("media")
                .chars()
                .take(PREVIEW_CHARS)
                .collect();
            warn!(caller = %caller, preview = %preview, "unauthorized access attempt");
        }
        allowed
    }
}
