//! Script host benchmarks.
//!
//! Measures the per-tick cost of a script that calls a registered
//! invocation with a string argument, which is the shape of every lineage
//! query made from a script.
//!
//! Run with: `cargo bench --bench script_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use scion_lineage::object::ObjectId;
use scion_script::{
    InvocationContext, ScriptComms, ScriptConfig, ScriptInvocation, ScriptModule,
    ScriptModuleComms, ScriptType, ScriptValue,
};

const CHECKER: &str = r#"
    (module
      (import "scion" "textLength" (func $text_length (param i32 i32) (result i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "00000000-0000-0000-0000-000000000002")
      (func (export "tick")
        (drop (call $text_length (i32.const 0) (i32.const 36)))))
"#;

fn bench_invocation_tick(c: &mut Criterion) {
    let comms = ScriptComms::new();
    comms
        .register_script_invocation(ScriptInvocation::new(
            "textLength",
            vec![ScriptType::String],
            ScriptType::Integer,
            |_ctx, args| ScriptValue::Integer(args[0].as_str().map_or(0, |s| s.len() as i32)),
        ))
        .expect("register textLength");

    let context = InvocationContext::new(ObjectId::random(), ObjectId::random());
    let mut script =
        ScriptModule::from_bytes(&ScriptConfig::default(), CHECKER.as_bytes(), &comms, context)
            .expect("load checker script");

    c.bench_function("script_tick/string_invocation", |b| {
        b.iter(|| black_box(script.call_tick().expect("tick")));
    });
}

criterion_group!(benches, bench_invocation_tick);
criterion_main!(benches);
