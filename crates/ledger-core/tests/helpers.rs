use ledger_core::{digest, Ledger, LedgerConfig};
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};

pub fn random_payloads(seed: u64, count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(1..64);
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect()
        })
        .collect()
}

pub fn ledger_with_difficulty(difficulty: u32) -> Ledger {
    Ledger::with_config(LedgerConfig {
        difficulty,
        ..LedgerConfig::default()
    })
}

pub fn assert_linked(ledger: &Ledger) {
    for (i, pair) in ledger.blocks().windows(2).enumerate() {
        assert_eq!(
            pair[1].previous_hash,
            digest(&pair[0]),
            "block {} does not link to its predecessor",
            i + 1
        );
    }
}
