use criterion::Criterion;
use drivenet::{
    network::IdAllocator,
    random::default_rng,
    simulator::{input_names, output_names},
    NeuralNetwork, Telemetry,
};

fn bench_feedforward(bench: &mut Criterion) {
    let mut ids = IdAllocator::new();
    let mut rng = default_rng();
    let mut net = NeuralNetwork::new(&mut ids, &input_names(5), &output_names(), 2, 8).unwrap();
    net.mutate(1., 1., &mut rng).unwrap();
    let inputs = Telemetry {
        rays: vec![3.5, 7., -1., 12., 0.5],
        speed: 4.,
        steering_angle: -6.,
        ..Telemetry::default()
    }
    .network_inputs();

    bench.bench_function("feedforward", |b| {
        b.iter(|| net.feedforward(&inputs).unwrap())
    });

    bench.bench_function("sort-neurons", |b| b.iter(|| net.sort_neurons()));
}

pub fn benches() {
    #[cfg(not(feature = "smol_bench"))]
    let mut criterion: criterion::Criterion<_> = Criterion::default()
        .sample_size(1000)
        .significance_level(0.1);
    #[cfg(feature = "smol_bench")]
    let mut criterion: criterion::Criterion<_> = {
        use core::time::Duration;
        Criterion::default()
            .measurement_time(Duration::from_millis(1))
            .sample_size(10)
            .nresamples(1)
            .without_plots()
            .configure_from_args()
    };
    bench_feedforward(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}
