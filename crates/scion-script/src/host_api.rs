//! Host API for WASM scripts.
//!
//! Defines the [`HostState`] that lives inside the Wasmtime [`Store`] and
//! [`link_invocations`], which exposes every invocation registered in a
//! [`ScriptComms`] under the `"scion"` WASM import namespace.
//!
//! # ABI
//!
//! Each [`ScriptType`] maps to WASM values as follows:
//!
//! - `Integer` -> one `i32`
//! - `String` parameter -> `(ptr: i32, len: i32)` into the module's exported
//!   `memory`
//!
//! Invocations must return `Integer`; the result is a single `i32`. An
//! invocation whose arguments cannot be decoded (bad pointer, invalid UTF-8)
//! answers `0` rather than trapping the script.
//!
//! # Utility imports
//!
//! - `log(level: i32, msg_ptr: i32, msg_len: i32)`
//!
//! [`Store`]: wasmtime::Store

use scion_lineage::object::ObjectId;
use wasmtime::{Caller, Engine, FuncType, Linker, StoreLimits, StoreLimitsBuilder, Val, ValType};

use crate::invocation::{InvocationContext, ScriptComms, ScriptInvocation, ScriptType, ScriptValue};

/// Import namespace for every host function.
pub const NAMESPACE: &str = "scion";

// ---------------------------------------------------------------------------
// HostState
// ---------------------------------------------------------------------------

/// State held inside the Wasmtime store for host function dispatch.
pub struct HostState {
    /// Implicit caller identity passed to every invocation.
    pub context: InvocationContext,

    /// Number of host function calls made during the current tick.
    /// Reset on [`begin_tick`](Self::begin_tick).
    pub host_call_count: u32,

    /// Memory limits enforced by the store.
    pub(crate) limits: StoreLimits,
}

impl HostState {
    /// Create host state for a script running in `context`.
    pub fn new(context: InvocationContext, memory_limit_bytes: usize) -> Self {
        Self {
            context,
            host_call_count: 0,
            limits: StoreLimitsBuilder::new()
                .memory_size(memory_limit_bytes)
                .build(),
        }
    }

    /// Reset per-tick bookkeeping.
    pub fn begin_tick(&mut self) {
        self.host_call_count = 0;
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::new(
            InvocationContext::new(ObjectId::ZERO, ObjectId::ZERO),
            crate::ScriptConfig::default().memory_limit_bytes,
        )
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("context", &self.context)
            .field("host_call_count", &self.host_call_count)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

/// Register the utility imports and every linkable invocation in `comms`
/// under [`NAMESPACE`].
///
/// Invocations that do not return `Integer` cannot be expressed in the ABI
/// and are skipped with a warning.
///
/// # Errors
///
/// Returns an error if Wasmtime rejects a definition (for example two
/// definitions with the same name).
pub fn link_invocations(
    linker: &mut Linker<HostState>,
    engine: &Engine,
    comms: &ScriptComms,
) -> Result<(), anyhow::Error> {
    linker.func_wrap(NAMESPACE, "log", host_log)?;

    for invocation in comms.invocations() {
        if invocation.returns() != ScriptType::Integer {
            tracing::warn!(
                name = invocation.name(),
                returns = ?invocation.returns(),
                "script invocation cannot be linked into WASM: only Integer returns are supported"
            );
            continue;
        }
        link_invocation(linker, engine, invocation)?;
    }

    Ok(())
}

fn link_invocation(
    linker: &mut Linker<HostState>,
    engine: &Engine,
    invocation: ScriptInvocation,
) -> Result<(), anyhow::Error> {
    let params: Vec<ValType> = invocation
        .params()
        .iter()
        .flat_map(|ty| match ty {
            ScriptType::Integer => vec![ValType::I32],
            ScriptType::String => vec![ValType::I32, ValType::I32],
        })
        .collect();
    let ty = FuncType::new(engine, params, [ValType::I32]);
    let name = invocation.name().to_owned();

    linker.func_new(
        NAMESPACE,
        &name,
        ty,
        move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
            caller.data_mut().host_call_count += 1;

            let answer = match decode_args(&mut caller, invocation.params(), params) {
                Ok(args) => {
                    let context = caller.data().context;
                    match invocation.call(&context, &args) {
                        Ok(value) => value.as_integer().unwrap_or(0),
                        Err(e) => {
                            tracing::warn!(error = %e, "script invocation failed");
                            0
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        name = invocation.name(),
                        error = %e,
                        "failed to decode script invocation arguments"
                    );
                    0
                }
            };

            if let Some(slot) = results.first_mut() {
                *slot = Val::I32(answer);
            }
            Ok(())
        },
    )?;

    tracing::trace!(name = %name, "linked script invocation");
    Ok(())
}

/// Turn raw WASM values into [`ScriptValue`]s according to `types`.
fn decode_args(
    caller: &mut Caller<'_, HostState>,
    types: &[ScriptType],
    raw: &[Val],
) -> Result<Vec<ScriptValue>, String> {
    let mut args = Vec::with_capacity(types.len());
    let mut cursor = 0usize;

    for ty in types {
        match ty {
            ScriptType::Integer => {
                let value = raw_i32(raw, cursor)?;
                cursor += 1;
                args.push(ScriptValue::Integer(value));
            }
            ScriptType::String => {
                let ptr = raw_i32(raw, cursor)?;
                let len = raw_i32(raw, cursor + 1)?;
                cursor += 2;
                args.push(ScriptValue::String(read_wasm_string(caller, ptr, len)?));
            }
        }
    }

    Ok(args)
}

fn raw_i32(raw: &[Val], index: usize) -> Result<i32, String> {
    match raw.get(index) {
        Some(Val::I32(v)) => Ok(*v),
        other => Err(format!("expected i32 argument at position {index}, got {other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Helper: read a string from WASM linear memory
// ---------------------------------------------------------------------------

/// Read a UTF-8 string from WASM linear memory at the given (ptr, len).
///
/// # Errors
///
/// Returns an error if:
/// - The WASM module has no exported memory named `"memory"`.
/// - The (ptr, len) range is negative or out of bounds.
/// - The bytes are not valid UTF-8.
fn read_wasm_string(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Result<String, String> {
    let memory = caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| {
            "WASM script must export 'memory' to pass strings -- \
             add `(memory (export \"memory\") 1)` to your module"
                .to_owned()
        })?;

    let (Ok(start), Ok(len_bytes)) = (usize::try_from(ptr), usize::try_from(len)) else {
        return Err(format!("negative string range: ptr={ptr}, len={len}"));
    };

    let data = memory.data(&caller);
    let bytes = start
        .checked_add(len_bytes)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            format!(
                "WASM string read out of bounds: ptr={ptr}, len={len}, memory_size={}",
                data.len()
            )
        })?;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| format!("WASM string at ptr={ptr} len={len} is not valid UTF-8: {e}"))
}

// ---------------------------------------------------------------------------
// UTILITY host functions
// ---------------------------------------------------------------------------

/// `log(level: i32, msg_ptr: i32, msg_len: i32)`
///
/// Level mapping: 0 = trace, 1 = debug, 2 = info, 3 = warn, 4 = error.
fn host_log(mut caller: Caller<'_, HostState>, level: i32, msg_ptr: i32, msg_len: i32) {
    caller.data_mut().host_call_count += 1;

    let msg = match read_wasm_string(&mut caller, msg_ptr, msg_len) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "log: failed to read message from WASM memory");
            return;
        }
    };

    let script = caller.data().context.script;
    match level {
        0 => tracing::trace!(source = "script", %script, "{msg}"),
        1 => tracing::debug!(source = "script", %script, "{msg}"),
        2 => tracing::info!(source = "script", %script, "{msg}"),
        3 => tracing::warn!(source = "script", %script, "{msg}"),
        4 => tracing::error!(source = "script", %script, "{msg}"),
        _ => tracing::info!(source = "script", %script, level = level, "{msg}"),
    }
}
