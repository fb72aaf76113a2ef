//! Benchmarks for branch relaxation and module record emission.
//!
//! ```bash
//! cargo bench --bench relaxation
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pandabc::{BytecodeEmitter, Label, ModuleRecord, ModuleRecordEmitter, ModuleRecordOptions};
use std::hint::black_box;

/// `blocks` basic blocks of `filler` instructions, each ending in a forward
/// branch past the next block and a backward branch to the first.
fn branchy_function(blocks: usize, filler: usize) -> BytecodeEmitter {
    let mut emitter = BytecodeEmitter::new();
    let labels: Vec<Label> = (0..=blocks + 1).map(|_| emitter.create_label()).collect();
    for block in 0..blocks {
        emitter.bind(labels[block]).unwrap();
        for i in 0..filler {
            emitter.ldai(i as i32).unwrap();
        }
        emitter.jeqz(labels[block + 2]).unwrap();
        emitter.jlt(1, labels[0]).unwrap();
    }
    emitter.bind(labels[blocks]).unwrap();
    emitter.nop().unwrap();
    emitter.bind(labels[blocks + 1]).unwrap();
    emitter.return_undefined().unwrap();
    emitter
}

fn relaxation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter/relaxation");

    // Short distances: nothing widens
    let small = branchy_function(64, 4);
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_function("no_growth", |b| {
        b.iter(|| {
            let mut emitter = small.clone();
            black_box(emitter.build().unwrap())
        });
    });

    // Blocks past the 8-bit range: every forward branch widens
    let medium = branchy_function(256, 30);
    group.throughput(Throughput::Bytes(medium.len() as u64));
    group.bench_function("widen_16", |b| {
        b.iter(|| {
            let mut emitter = medium.clone();
            black_box(emitter.build().unwrap())
        });
    });

    // Backward compares beyond 16 bits turn into far jumps
    let large = branchy_function(128, 1_000);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("far_jumps", |b| {
        b.iter(|| {
            let mut emitter = large.clone();
            black_box(emitter.build().unwrap())
        });
    });

    group.finish();
}

fn module_record_benchmarks(c: &mut Criterion) {
    let mut record = ModuleRecord::new();
    for i in 0..500 {
        let request = record.add_module_request(&format!("./dep{}", i % 50), i % 3 == 0);
        record.add_import(&format!("i{i}"), "value", request).unwrap();
        record
            .add_local_export(&format!("l{}", i % 200), &format!("e{i}"), i % 2 == 0)
            .unwrap();
    }

    let mut group = c.benchmark_group("module/record");
    group.bench_function("generate_500", |b| {
        b.iter(|| {
            let options = ModuleRecordOptions::new().with_phase_record(true);
            let mut emitter = ModuleRecordEmitter::new(black_box(&record), 0, 1, options);
            emitter.generate().unwrap();
            black_box(emitter.into_output())
        });
    });
    group.finish();
}

criterion_group!(benches, relaxation_benchmarks, module_record_benchmarks);

criterion_main!(benches);
