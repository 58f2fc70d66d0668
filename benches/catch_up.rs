//! Catch-up throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use snake_sync::game::{Direction, GameConfig, Simulation};
use snake_sync::network::{ClientHub, ClientId, InputMessage, SyncConfig, SyncController};

fn bench_steps(c: &mut Criterion) {
    c.bench_function("simulation_step_1000", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(GameConfig::default(), 7);
            for i in 0..1000u32 {
                if i % 17 == 0 {
                    sim.set_direction(Direction::ALL[(i as usize / 17) % 4]);
                }
                black_box(sim.step());
            }
        })
    });
}

fn bench_catch_up(c: &mut Criterion) {
    let client = ClientId::new([1; 16]);
    let hub = ClientHub::new();
    let mut group = c.benchmark_group("catch_up");

    for owed in [1i64, 60, 600] {
        group.bench_with_input(BenchmarkId::from_parameter(owed), &owed, |b, &owed| {
            b.iter(|| {
                let mut sync = SyncController::new(
                    Simulation::new(GameConfig::default(), 7),
                    SyncConfig::default(),
                );
                let baseline = InputMessage::new(Direction::Down, 0, 0.0);
                let _ = sync.handle_input(client, &baseline, &hub);
                let behind = InputMessage::new(Direction::Down, owed, 0.0);
                let _ = sync.handle_input(client, &behind, &hub);
                black_box(sync.state().score)
            })
        });
    }

    group.finish();
}

fn bench_random_inputs(c: &mut Criterion) {
    let client = ClientId::new([2; 16]);
    let hub = ClientHub::new();
    let mut rng = StdRng::seed_from_u64(42);
    let inputs: Vec<InputMessage> = {
        let mut frame = 0i64;
        (0..500)
            .map(|_| {
                frame += rng.gen_range(0..8);
                let direction = Direction::ALL[rng.gen_range(0..4)];
                InputMessage::new(direction, frame, frame as f64 * 16.0)
            })
            .collect()
    };

    c.bench_function("random_input_stream_500", |b| {
        b.iter(|| {
            let mut sync = SyncController::new(
                Simulation::new(GameConfig::default(), 9),
                SyncConfig::default(),
            );
            for input in &inputs {
                let _ = sync.handle_input(client, input, &hub);
            }
            black_box(sync.state().compute_hash())
        })
    });
}

criterion_group!(benches, bench_steps, bench_catch_up, bench_random_inputs);
criterion_main!(benches);
