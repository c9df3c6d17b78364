//! # Simulation Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use finger_lib::{
    ctrl_loop::{ControlLoop, DEFAULT_PERIOD},
    law::{PdLaw, PidLaw},
    learner::{LinearPolicy, TrainingSample},
    setpoint::SetpointRegister,
    sim::{simulate, FingerPlant, PlantParams, StepTarget},
    state_est::{FixedState, JointState},
};
use std::sync::Arc;

fn sim_benchmark(c: &mut Criterion) {
    let step = StepTarget::default();

    // Four second PID run on the default plant
    c.bench_function("simulate::pid", |b| {
        b.iter(|| {
            let mut plant = FingerPlant::new(PlantParams::default()).unwrap();
            let mut pid = PidLaw::new(3.8, 1.6, 0.12);
            simulate(&mut pid, |t| step.at(t), black_box(4.0), &mut plant).unwrap()
        })
    });

    // Training on the PID trace
    let mut plant = FingerPlant::new(PlantParams::default()).unwrap();
    let records = simulate(&mut PidLaw::new(3.8, 1.6, 0.12), |t| step.at(t), 4.0, &mut plant)
        .unwrap();
    let samples: Vec<TrainingSample> = records.iter().map(TrainingSample::from_record).collect();

    c.bench_function("LinearPolicy::fit", |b| {
        b.iter(|| {
            let mut policy = LinearPolicy::new(2.0).unwrap();
            policy.fit(black_box(&samples), 0.003, 20).unwrap();
            policy
        })
    });

    // A single tick of the loop, no timer
    let mut ctrl_loop = ControlLoop::new(
        Arc::new(SetpointRegister::new(0.8)),
        PdLaw::default(),
        FixedState(JointState::new(0.1, 0.5)),
        Vec::with_capacity(1),
        DEFAULT_PERIOD,
    )
    .unwrap();

    c.bench_function("ControlLoop::tick", |b| {
        b.iter(|| {
            let command = ctrl_loop.tick(black_box(0.01));
            ctrl_loop.sink_mut().clear();
            command
        })
    });
}

criterion_group!(benches, sim_benchmark);
criterion_main!(benches);
