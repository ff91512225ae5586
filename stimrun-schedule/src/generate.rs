use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use stimrun_core::{ONSETS_SECS, STIMULI, Schedule, Trial};

/// Builds the trial schedule for one subject.
///
/// The subject id seeds the RNG, so the label order is reproducible per
/// subject. Onsets are assigned by row position and are never permuted.
pub fn generate(subject: u32) -> Schedule {
    let mut rng = StdRng::seed_from_u64(subject as u64);

    let mut labels: Vec<&str> = STIMULI.to_vec();
    labels.shuffle(&mut rng);

    let trials = labels
        .into_iter()
        .zip(ONSETS_SECS)
        .map(|(label, onset_secs)| Trial::new(label, onset_secs))
        .collect();

    Schedule::new(subject, trials)
}
