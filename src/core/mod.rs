use rand::distr::{Alphanumeric, SampleString};

pub mod chunk;

pub mod item;

pub mod listener;

pub mod record;

pub mod step;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
