//! Script invocations: host functions that in-world scripts may call.
//!
//! A region module that wants to expose a function to scripts builds a
//! [`ScriptInvocation`] and registers it with whatever implements
//! [`ScriptModuleComms`] for that region. The concrete registry in this crate
//! is [`ScriptComms`]; script runtimes (see [`crate::ScriptModule`]) link
//! every registered invocation into the scripts they load.
//!
//! Every call carries an implicit [`InvocationContext`] naming the part that
//! hosts the calling script and the script item itself. Scripts only pass
//! the explicit arguments.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use scion_lineage::object::ObjectId;
use serde::{Deserialize, Serialize};

use crate::ScriptError;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The type of a script-visible argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    /// 32-bit signed integer.
    Integer,
    /// UTF-8 text.
    String,
}

/// A script-visible argument or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    Integer(i32),
    String(String),
}

impl ScriptValue {
    /// The [`ScriptType`] of this value.
    pub fn script_type(&self) -> ScriptType {
        match self {
            ScriptValue::Integer(_) => ScriptType::Integer,
            ScriptValue::String(_) => ScriptType::String,
        }
    }

    /// The integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            ScriptValue::Integer(v) => Some(*v),
            ScriptValue::String(_) => None,
        }
    }

    /// The text payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            ScriptValue::Integer(_) => None,
        }
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Integer(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(s.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(s)
    }
}

// ---------------------------------------------------------------------------
// InvocationContext
// ---------------------------------------------------------------------------

/// Who is calling: the part hosting the script, and the script item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationContext {
    /// The part the calling script lives in.
    pub host: ObjectId,
    /// The script item id.
    pub script: ObjectId,
}

impl InvocationContext {
    pub fn new(host: ObjectId, script: ObjectId) -> Self {
        Self { host, script }
    }
}

// ---------------------------------------------------------------------------
// ScriptInvocation
// ---------------------------------------------------------------------------

/// The callable behind a [`ScriptInvocation`].
pub type InvocationFn = Arc<dyn Fn(&InvocationContext, &[ScriptValue]) -> ScriptValue + Send + Sync>;

/// A named, typed host function exposed to scripts.
#[derive(Clone)]
pub struct ScriptInvocation {
    name: String,
    params: Vec<ScriptType>,
    returns: ScriptType,
    func: InvocationFn,
}

impl ScriptInvocation {
    /// Describe a new invocation.
    ///
    /// `func` receives arguments already checked against `params` and must
    /// return a value of type `returns`.
    pub fn new<F>(name: impl Into<String>, params: Vec<ScriptType>, returns: ScriptType, func: F) -> Self
    where
        F: Fn(&InvocationContext, &[ScriptValue]) -> ScriptValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            returns,
            func: Arc::new(func),
        }
    }

    /// The script-visible function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types, in order.
    pub fn params(&self) -> &[ScriptType] {
        &self.params
    }

    /// Declared return type.
    pub fn returns(&self) -> ScriptType {
        self.returns
    }

    /// Type-check `args` and run the invocation.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::ArgumentMismatch`] if `args` do not match the
    ///   declared parameters.
    /// - [`ScriptError::ReturnMismatch`] if the function returned a value of
    ///   the wrong type.
    pub fn call(&self, context: &InvocationContext, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        let actual: Vec<ScriptType> = args.iter().map(ScriptValue::script_type).collect();
        if actual != self.params {
            return Err(ScriptError::ArgumentMismatch {
                name: self.name.clone(),
                expected: self.params.clone(),
                actual,
            });
        }

        let value = (self.func)(context, args);
        if value.script_type() != self.returns {
            return Err(ScriptError::ReturnMismatch {
                name: self.name.clone(),
                declared: self.returns,
                actual: value.script_type(),
            });
        }
        Ok(value)
    }
}

impl fmt::Debug for ScriptInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptInvocation")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ScriptModuleComms
// ---------------------------------------------------------------------------

/// Region capability for exposing host functions to scripts.
///
/// A region may or may not provide this capability; modules that need it
/// resolve it when the region finishes loading and skip registration when
/// it is absent.
pub trait ScriptModuleComms: Send + Sync {
    /// Make `invocation` callable from scripts in this region.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::DuplicateInvocation`] if the name is taken.
    fn register_script_invocation(&self, invocation: ScriptInvocation) -> Result<(), ScriptError>;
}

// ---------------------------------------------------------------------------
// ScriptComms
// ---------------------------------------------------------------------------

/// In-process registry of script invocations, keyed by name.
#[derive(Debug, Default)]
pub struct ScriptComms {
    invocations: RwLock<BTreeMap<String, ScriptInvocation>>,
}

impl ScriptComms {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an invocation by name.
    pub fn invocation(&self, name: &str) -> Option<ScriptInvocation> {
        self.invocations.read().get(name).cloned()
    }

    /// All registered invocations, sorted by name.
    pub fn invocations(&self) -> Vec<ScriptInvocation> {
        self.invocations.read().values().cloned().collect()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.invocations.read().keys().cloned().collect()
    }

    /// Number of registered invocations.
    pub fn len(&self) -> usize {
        self.invocations.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.invocations.read().is_empty()
    }

    /// Call a registered invocation directly.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::UnknownInvocation`] if no invocation has that name.
    /// - Any error from [`ScriptInvocation::call`].
    pub fn invoke(
        &self,
        name: &str,
        context: &InvocationContext,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        // Clone out so the lock is not held while the invocation runs.
        let invocation = self
            .invocation(name)
            .ok_or_else(|| ScriptError::UnknownInvocation {
                name: name.to_owned(),
            })?;
        invocation.call(context, args)
    }
}

impl ScriptModuleComms for ScriptComms {
    fn register_script_invocation(&self, invocation: ScriptInvocation) -> Result<(), ScriptError> {
        let mut invocations = self.invocations.write();
        if invocations.contains_key(invocation.name()) {
            return Err(ScriptError::DuplicateInvocation {
                name: invocation.name().to_owned(),
            });
        }

        tracing::debug!(
            name = invocation.name(),
            params = ?invocation.params(),
            returns = ?invocation.returns(),
            "registered script invocation"
        );
        invocations.insert(invocation.name().to_owned(), invocation);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
