use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use truncnorm_bayes::{EstimationOptions, SamplerOptions, TruncatedSample, estimate_truncated_normal};

fn main() {
    let (lower, upper) = (0.0, 2.0);
    let mut rng = StdRng::seed_from_u64(7);
    let mut observations = Vec::with_capacity(100);
    while observations.len() < 100 {
        let value = 0.5f64.mul_add(sample_standard_normal(&mut rng), 0.5);
        if (lower..=upper).contains(&value) {
            observations.push(value);
        }
    }

    let sample = TruncatedSample::new(observations, lower, upper);
    let options = EstimationOptions {
        sampler: SamplerOptions::default().with_seed(2_024),
        ..EstimationOptions::default()
    };
    let result = estimate_truncated_normal(&sample, &options).expect("estimation");

    println!("true mean 0.5, true sd 0.5, bounds [{lower}, {upper}]");
    println!("{}", result.render_table());
    for (index, chain) in result.fit().chains.iter().enumerate() {
        println!("chain {index}: acceptance {:.2}", chain.acceptance_rate);
    }
}

fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
