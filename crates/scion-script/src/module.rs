//! WASM script loading, validation, and execution.
//!
//! [`ScriptModule`] wraps a Wasmtime instance of an in-world script. It
//! enforces fuel metering and memory limits, links the region's registered
//! script invocations, and validates that the required `tick()` export
//! exists before allowing execution.

use wasmtime::{Engine, Instance, Linker, Module, Store};

use crate::host_api::{self, HostState};
use crate::invocation::{InvocationContext, ScriptComms};
use crate::ScriptError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the script sandbox.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScriptConfig {
    /// Fuel units granted per `tick()` call. When fuel runs out, execution
    /// traps with [`ScriptError::OutOfFuel`]. Default: 1,000,000.
    pub fuel_per_tick: u64,

    /// Maximum linear memory a script may allocate, in bytes.
    /// Default: 16 MiB.
    pub memory_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            fuel_per_tick: 1_000_000,
            memory_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptModule
// ---------------------------------------------------------------------------

/// A loaded and validated WASM script.
///
/// # Sandbox Guarantees
///
/// - No WASI (no filesystem, no network, no wall-clock time)
/// - Only the `"scion"` imports registered through [`ScriptComms`]
/// - Fuel metering prevents infinite loops
/// - Memory is capped at [`ScriptConfig::memory_limit_bytes`]
pub struct ScriptModule {
    store: Store<HostState>,
    instance: Instance,
    config: ScriptConfig,
}

impl ScriptModule {
    /// Load and instantiate a script from raw bytes (`.wasm` or `.wat`).
    ///
    /// Every invocation currently registered in `comms` is linked; a script
    /// importing a function that is not registered fails to instantiate.
    /// `context` is passed to every invocation the script makes.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::CompileError`] if the bytes are not valid WASM/WAT.
    /// - [`ScriptError::MissingExport`] if `tick()` is not exported.
    /// - [`ScriptError::Runtime`] if linking or instantiation fails (e.g.
    ///   unsatisfied imports, initial memory above the limit).
    pub fn from_bytes(
        config: &ScriptConfig,
        bytes: &[u8],
        comms: &ScriptComms,
        context: InvocationContext,
    ) -> Result<Self, ScriptError> {
        let mut engine_config = wasmtime::Config::new();
        engine_config.consume_fuel(true);

        let engine = Engine::new(&engine_config)
            .map_err(|e| ScriptError::Runtime(format!("failed to create Wasmtime engine: {e}")))?;

        let module =
            Module::new(&engine, bytes).map_err(|e| ScriptError::CompileError(format!("{e}")))?;

        let has_tick = module.exports().any(|export| export.name() == "tick");
        if !has_tick {
            return Err(ScriptError::MissingExport {
                name: "tick".to_owned(),
            });
        }

        let mut store = Store::new(
            &engine,
            HostState::new(context, config.memory_limit_bytes),
        );
        store.limiter(|state| &mut state.limits);
        store
            .set_fuel(config.fuel_per_tick)
            .map_err(|e| ScriptError::Runtime(format!("failed to set fuel: {e}")))?;

        let mut linker = Linker::new(&engine);
        host_api::link_invocations(&mut linker, &engine, comms)
            .map_err(|e| ScriptError::Runtime(format!("failed to link script invocations: {e}")))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| ScriptError::Runtime(format!("{e}")))?;

        tracing::debug!(
            host = %context.host,
            script = %context.script,
            fuel_per_tick = config.fuel_per_tick,
            memory_limit = config.memory_limit_bytes,
            invocations = comms.len(),
            "script loaded and instantiated"
        );

        Ok(Self {
            store,
            instance,
            config: config.clone(),
        })
    }

    /// Execute the script's `tick()` function.
    ///
    /// Resets fuel to [`ScriptConfig::fuel_per_tick`] before calling and
    /// returns the amount consumed.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::OutOfFuel`] if the function exhausts the fuel budget.
    /// - [`ScriptError::Trap`] if a WASM trap occurs.
    /// - [`ScriptError::Runtime`] if the `tick` export cannot be resolved.
    pub fn call_tick(&mut self) -> Result<u64, ScriptError> {
        self.reset_fuel()?;
        self.store.data_mut().begin_tick();

        let tick_fn = self
            .instance
            .get_typed_func::<(), ()>(&mut self.store, "tick")
            .map_err(|e| ScriptError::Runtime(format!("failed to resolve tick(): {e}")))?;

        tick_fn
            .call(&mut self.store, ())
            .map_err(|e| self.classify_trap(e))?;

        let remaining = self
            .store
            .get_fuel()
            .map_err(|e| ScriptError::Runtime(format!("failed to read fuel: {e}")))?;
        let consumed = self.config.fuel_per_tick.saturating_sub(remaining);

        tracing::trace!(
            fuel_consumed = consumed,
            host_calls = self.store.data().host_call_count,
            "tick() completed"
        );

        Ok(consumed)
    }

    /// Call a named export that takes no arguments and returns an `i32`.
    ///
    /// Fuel is NOT reset before this call.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::Runtime`] if the export does not exist or has the
    ///   wrong signature.
    /// - [`ScriptError::Trap`] or [`ScriptError::OutOfFuel`] on execution
    ///   failure.
    pub fn call_i32_export(&mut self, name: &str) -> Result<i32, ScriptError> {
        let func = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, name)
            .map_err(|e| ScriptError::Runtime(format!("failed to resolve export '{name}': {e}")))?;

        func.call(&mut self.store, ())
            .map_err(|e| self.classify_trap(e))
    }

    /// Fuel remaining in the store.
    pub fn fuel_remaining(&self) -> u64 {
        self.store.get_fuel().unwrap_or(0)
    }

    /// The configuration used to create this script.
    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// The caller identity passed to invocations.
    pub fn context(&self) -> InvocationContext {
        self.store.data().context
    }

    /// Host state (call counters, context).
    pub fn host_state(&self) -> &HostState {
        self.store.data()
    }

    // -- Internal helpers ---------------------------------------------------

    fn reset_fuel(&mut self) -> Result<(), ScriptError> {
        self.store
            .set_fuel(self.config.fuel_per_tick)
            .map_err(|e| ScriptError::Runtime(format!("failed to set fuel: {e}")))
    }

    /// Classify a Wasmtime error into the appropriate [`ScriptError`].
    fn classify_trap(&self, error: anyhow::Error) -> ScriptError {
        for cause in error.chain() {
            if let Some(trap) = cause.downcast_ref::<wasmtime::Trap>() {
                if *trap == wasmtime::Trap::OutOfFuel {
                    return ScriptError::OutOfFuel {
                        budget: self.config.fuel_per_tick,
                    };
                }
                return ScriptError::Trap(format!("{error}"));
            }
        }

        ScriptError::Runtime(format!("{error}"))
    }
}

impl std::fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptModule")
            .field("config", &self.config)
            .field("context", &self.context())
            .field("fuel_remaining", &self.fuel_remaining())
            .finish_non_exhaustive()
    }
}
