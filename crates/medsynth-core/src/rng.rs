//! Deterministic random streams.
//!
//! Every draw in the generator comes from a stream derived from the master
//! seed and a string id. Stages use one stream per patient
//! (`"<stage>/<patient_id>"`), so a patient's records depend only on the
//! seed, their identifier, and the catalog; adding patients never perturbs
//! the ones already generated.

use blake2::{Blake2b512, Digest};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use medsynth_contracts::ids::PatientId;

/// Build a generator from the master seed and a stream id.
///
/// `"{id}{global_seed}"` is hashed with Blake2b-512 and the first 32 bytes
/// of the digest seed a ChaCha8 generator. Callers must not reuse an id
/// unless they want the same sequence.
pub fn make_rng(global_seed: u64, id: &str) -> ChaCha8Rng {
    let mut hasher = Blake2b512::new();
    hasher.update(format!("{id}{global_seed}"));
    let digest = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest[..32]);
    ChaCha8Rng::from_seed(seed)
}

/// The stream one stage uses for one patient.
pub fn patient_rng(global_seed: u64, stage: &str, patient_id: PatientId) -> ChaCha8Rng {
    make_rng(global_seed, &format!("{stage}/{patient_id}"))
}
