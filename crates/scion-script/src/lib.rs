//! Scion Script -- script invocation bridge and sandboxed WASM script host.
//!
//! Region modules expose host functions to in-world scripts by registering
//! [`ScriptInvocation`]s with a region's [`ScriptModuleComms`] capability.
//! This crate provides that capability ([`ScriptComms`]) and a Wasmtime-based
//! runtime ([`ScriptModule`]) that links every registered invocation into the
//! scripts it loads.
//!
//! # Architecture
//!
//! - **`ScriptInvocation`**: a named, typed host function.
//! - **`ScriptComms`**: the per-region registry of invocations.
//! - **`ScriptModule`**: loads, validates, and runs a WASM script with a
//!   required `tick()` export, fuel metering and a memory cap.
//! - **`ScriptError`**: registration, argument and runtime failures.
//!
//! # Example
//!
//! ```no_run
//! use scion_lineage::object::ObjectId;
//! use scion_script::{InvocationContext, ScriptComms, ScriptConfig, ScriptModule};
//!
//! let comms = ScriptComms::new();
//! let context = InvocationContext::new(ObjectId::random(), ObjectId::random());
//! let wat = r#"(module (func (export "tick") nop))"#;
//! let mut script =
//!     ScriptModule::from_bytes(&ScriptConfig::default(), wat.as_bytes(), &comms, context).unwrap();
//! assert!(script.call_tick().unwrap() > 0);
//! ```

#![deny(unsafe_code)]

pub mod host_api;
pub mod invocation;
mod module;

pub use host_api::HostState;
pub use invocation::{
    InvocationContext, InvocationFn, ScriptComms, ScriptInvocation, ScriptModuleComms, ScriptType,
    ScriptValue,
};
pub use module::{ScriptConfig, ScriptModule};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by script registration and execution.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// An invocation with this name is already registered.
    #[error("script invocation '{name}' is already registered")]
    DuplicateInvocation { name: String },

    /// No invocation with this name is registered.
    #[error("no script invocation named '{name}'")]
    UnknownInvocation { name: String },

    /// Arguments did not match the declared parameter types.
    #[error("script invocation '{name}' expects {expected:?}, got {actual:?}")]
    ArgumentMismatch {
        name: String,
        expected: Vec<ScriptType>,
        actual: Vec<ScriptType>,
    },

    /// The invocation returned a value of the wrong type.
    #[error("script invocation '{name}' declared {declared:?} but returned {actual:?}")]
    ReturnMismatch {
        name: String,
        declared: ScriptType,
        actual: ScriptType,
    },

    /// The WASM binary could not be compiled (invalid bytecode or WAT syntax).
    #[error("script compilation failed: {0}")]
    CompileError(String),

    /// The script does not export a required function.
    #[error("missing required export '{name}' -- scripts must export a `tick()` function")]
    MissingExport { name: String },

    /// The script exhausted its fuel budget.
    #[error("script ran out of fuel (budget: {budget} units)")]
    OutOfFuel { budget: u64 },

    /// A WASM trap occurred during execution.
    #[error("script trap: {0}")]
    Trap(String),

    /// A general runtime error from the Wasmtime engine.
    #[error("script runtime error: {0}")]
    Runtime(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use scion_lineage::object::ObjectId;

    const NOOP: &str = r#"(module (func (export "tick") nop))"#;

    const COUNTER: &str = r#"
        (module
          (global $count (mut i32) (i32.const 0))
          (func (export "tick")
            (global.set $count (i32.add (global.get $count) (i32.const 1))))
          (func (export "get_count") (result i32) (global.get $count)))
    "#;

    const FUEL_HOG: &str = r#"
        (module
          (func (export "tick")
            (loop $forever (br $forever))))
    "#;

    /// Calls `echoHost` and `textLength` from the `"scion"` namespace.
    const CALLER: &str = r#"
        (module
          (import "scion" "echoHost" (func $echo_host (result i32)))
          (import "scion" "textLength" (func $text_length (param i32 i32) (result i32)))
          (import "scion" "log" (func $log (param i32 i32 i32)))
          (memory (export "memory") 1)
          (data (i32.const 0) "hello")
          (global $host (mut i32) (i32.const -1))
          (global $len (mut i32) (i32.const -1))
          (global $bad (mut i32) (i32.const -1))
          (func (export "tick")
            (call $log (i32.const 2) (i32.const 0) (i32.const 5))
            (global.set $host (call $echo_host))
            (global.set $len (call $text_length (i32.const 0) (i32.const 5)))
            (global.set $bad (call $text_length (i32.const 65530) (i32.const 100))))
          (func (export "host") (result i32) (global.get $host))
          (func (export "len") (result i32) (global.get $len))
          (func (export "bad") (result i32) (global.get $bad)))
    "#;

    fn context() -> InvocationContext {
        InvocationContext::new(ObjectId::from_u128(77), ObjectId::from_u128(78))
    }

    fn load(wat: &str, comms: &ScriptComms) -> Result<ScriptModule, ScriptError> {
        ScriptModule::from_bytes(&ScriptConfig::default(), wat.as_bytes(), comms, context())
    }

    fn caller_comms() -> ScriptComms {
        let comms = ScriptComms::new();
        comms
            .register_script_invocation(ScriptInvocation::new(
                "echoHost",
                vec![],
                ScriptType::Integer,
                |ctx, _args| ScriptValue::Integer(ctx.host.to_u128() as i32),
            ))
            .unwrap();
        comms
            .register_script_invocation(ScriptInvocation::new(
                "textLength",
                vec![ScriptType::String],
                ScriptType::Integer,
                |_ctx, args| ScriptValue::Integer(args[0].as_str().map_or(-1, |s| s.len() as i32)),
            ))
            .unwrap();
        comms
    }

    // -- Loading ------------------------------------------------------------

    #[test]
    fn load_noop_script() {
        let script = load(NOOP, &ScriptComms::new());
        assert!(script.is_ok(), "noop script should load: {:?}", script.err());
    }

    #[test]
    fn invalid_bytes_fail_to_compile() {
        let err = load("(module (func", &ScriptComms::new()).unwrap_err();
        assert!(matches!(err, ScriptError::CompileError(_)), "got {err:?}");
    }

    #[test]
    fn missing_tick_export_returns_error() {
        let err = load("(module)", &ScriptComms::new()).unwrap_err();
        assert!(
            matches!(err, ScriptError::MissingExport { ref name } if name == "tick"),
            "expected MissingExport for 'tick', got: {err:?}"
        );
    }

    #[test]
    fn unregistered_import_fails_to_instantiate() {
        // No invocations registered: the "scion" imports cannot be satisfied.
        let err = load(CALLER, &ScriptComms::new()).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)), "got {err:?}");
    }

    #[test]
    fn initial_memory_above_limit_is_rejected() {
        let config = ScriptConfig {
            memory_limit_bytes: 64 * 1024,
            ..ScriptConfig::default()
        };
        let wat = r#"(module (memory 4) (func (export "tick") nop))"#;
        let result = ScriptModule::from_bytes(&config, wat.as_bytes(), &ScriptComms::new(), context());
        assert!(result.is_err(), "4 pages exceed a 1 page limit");
    }

    // -- Execution ----------------------------------------------------------

    #[test]
    fn noop_tick_consumes_fuel_deterministically() {
        let mut script = load(NOOP, &ScriptComms::new()).unwrap();
        let first = script.call_tick().unwrap();
        let second = script.call_tick().unwrap();
        assert!(first > 0);
        assert_eq!(first, second);
        assert!(script.fuel_remaining() < script.config().fuel_per_tick);
    }

    #[test]
    fn counter_increments_over_five_ticks() {
        let mut script = load(COUNTER, &ScriptComms::new()).unwrap();
        for _ in 0..5 {
            script.call_tick().unwrap();
        }
        assert_eq!(script.call_i32_export("get_count").unwrap(), 5);
    }

    #[test]
    fn fuel_exhaustion_returns_out_of_fuel() {
        let config = ScriptConfig {
            fuel_per_tick: 10_000,
            ..ScriptConfig::default()
        };
        let mut script =
            ScriptModule::from_bytes(&config, FUEL_HOG.as_bytes(), &ScriptComms::new(), context())
                .unwrap();
        let err = script.call_tick().unwrap_err();
        assert!(
            matches!(err, ScriptError::OutOfFuel { budget: 10_000 }),
            "expected OutOfFuel, got: {err:?}"
        );
    }

    #[test]
    fn unknown_export_is_runtime_error() {
        let mut script = load(NOOP, &ScriptComms::new()).unwrap();
        let err = script.call_i32_export("nope").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)), "got {err:?}");
    }

    // -- Host API -----------------------------------------------------------

    #[test]
    fn invocations_receive_context_and_string_arguments() {
        let comms = caller_comms();
        let mut script = load(CALLER, &comms).unwrap();

        script.call_tick().unwrap();

        assert_eq!(script.call_i32_export("host").unwrap(), 77);
        assert_eq!(script.call_i32_export("len").unwrap(), 5);
        assert_eq!(script.context(), context());
    }

    #[test]
    fn out_of_bounds_string_answers_zero() {
        let comms = caller_comms();
        let mut script = load(CALLER, &comms).unwrap();

        script.call_tick().unwrap();

        assert_eq!(script.call_i32_export("bad").unwrap(), 0);
    }

    #[test]
    fn host_calls_are_counted_per_tick() {
        let comms = caller_comms();
        let mut script = load(CALLER, &comms).unwrap();

        script.call_tick().unwrap();
        assert_eq!(script.host_state().host_call_count, 4);
        script.call_tick().unwrap();
        assert_eq!(script.host_state().host_call_count, 4);
    }

    #[test]
    fn string_returning_invocations_are_not_linked() {
        let comms = ScriptComms::new();
        comms
            .register_script_invocation(ScriptInvocation::new(
                "name",
                vec![],
                ScriptType::String,
                |_ctx, _args| ScriptValue::from("x"),
            ))
            .unwrap();

        // Loading a script that does not import it still works.
        assert!(load(NOOP, &comms).is_ok());

        let importer = r#"
            (module
              (import "scion" "name" (func (result i32)))
              (func (export "tick") nop))
        "#;
        assert!(load(importer, &comms).is_err());
    }
}
