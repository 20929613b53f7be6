//! Script-facing lineage queries.
//!
//! [`LineageQueries`] answers the two script functions in terms of the
//! calling script's host part:
//!
//! - `primDescendantsCount()` -> number of transitive copies of the host's
//!   object group.
//! - `primDescendantsCheck(key)` -> `1` if `key` names a transitive copy of
//!   the host's object group, else `0`.
//!
//! Host parts are mapped to their group root through an [`ObjectLookup`].
//! Neither function fails: unknown hosts and unparseable keys answer `0`.

use std::sync::Arc;

use scion_lineage::object::ObjectId;
use scion_lineage::registry::DescendantRegistry;
use scion_script::{InvocationContext, ScriptInvocation, ScriptType, ScriptValue};

use crate::scene::Scene;

/// Script name of the count query.
pub const COUNT_INVOCATION: &str = "primDescendantsCount";

/// Script name of the membership query.
pub const CHECK_INVOCATION: &str = "primDescendantsCheck";

// ---------------------------------------------------------------------------
// ObjectLookup
// ---------------------------------------------------------------------------

/// Resolves a part to the root of the object group that owns it.
pub trait ObjectLookup: Send + Sync {
    fn group_root_of(&self, part: ObjectId) -> Option<ObjectId>;
}

impl ObjectLookup for Scene {
    fn group_root_of(&self, part: ObjectId) -> Option<ObjectId> {
        self.try_get_part_group(part)
    }
}

// ---------------------------------------------------------------------------
// LineageQueries
// ---------------------------------------------------------------------------

/// The lineage store plus a way to find a host part's group.
#[derive(Clone)]
pub struct LineageQueries {
    registry: Arc<DescendantRegistry>,
    lookup: Arc<dyn ObjectLookup>,
}

impl LineageQueries {
    pub fn new(registry: Arc<DescendantRegistry>, lookup: Arc<dyn ObjectLookup>) -> Self {
        Self { registry, lookup }
    }

    /// Count every transitive copy of the group owning `host`.
    ///
    /// `0` if the host part is not in any tracked scene. Saturates at
    /// `i32::MAX`.
    pub fn count_descendants(&self, host: ObjectId) -> i32 {
        let Some(root) = self.lookup.group_root_of(host) else {
            tracing::trace!(%host, "descendant count for unknown host part");
            return 0;
        };
        i32::try_from(self.registry.descendant_count(root)).unwrap_or(i32::MAX)
    }

    /// `1` if `candidate` parses and is a transitive copy of the group
    /// owning `host`, else `0`.
    pub fn check_descendant(&self, host: ObjectId, candidate: &str) -> i32 {
        let candidate = match ObjectId::parse(candidate) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(%host, error = %e, "descendant check with malformed object key");
                return 0;
            }
        };
        if host == candidate {
            return 0;
        }

        let Some(root) = self.lookup.group_root_of(host) else {
            return 0;
        };
        i32::from(self.registry.is_descendant(root, candidate, true))
    }

    /// Both queries as script invocations, ready for registration.
    pub fn invocations(&self) -> [ScriptInvocation; 2] {
        let count = self.clone();
        let check = self.clone();
        [
            ScriptInvocation::new(
                COUNT_INVOCATION,
                vec![],
                ScriptType::Integer,
                move |ctx: &InvocationContext, _args: &[ScriptValue]| {
                    ScriptValue::Integer(count.count_descendants(ctx.host))
                },
            ),
            ScriptInvocation::new(
                CHECK_INVOCATION,
                vec![ScriptType::String],
                ScriptType::Integer,
                move |ctx: &InvocationContext, args: &[ScriptValue]| {
                    let text = args.first().and_then(ScriptValue::as_str).unwrap_or_default();
                    ScriptValue::Integer(check.check_descendant(ctx.host, text))
                },
            ),
        ]
    }
}

impl std::fmt::Debug for LineageQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageQueries")
            .field("tracked_roots", &self.registry.tracked_roots())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
