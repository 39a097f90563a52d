//! Hardened blockchain checkpoints.
//!
//! A checkpoint pins a block hash to a height: forks below the pin are
//! rejected, which secures and speeds up initial sync. The tables also
//! carry transaction statistics at the last pin, used to estimate overall
//! verification progress.
use std::collections::BTreeMap;

use bitcoin_hashes::hex::FromHex;

use crate::block::{BlockHash, Height};
use crate::network::Network;

/// How many times transaction verification after the last checkpoint is
/// expected to be slower than before it (signatures are checked from there
/// on).
const SIGCHECK_VERIFICATION_FACTOR: f64 = 5.0;

/// Hardened checkpoints of the main network.
///
/// What makes a good checkpoint block?
/// + Is surrounded by blocks with reasonable timestamps
///   (no blocks before with a timestamp after, none after with
///    timestamp before)
/// + Contains no strange transactions
pub static MAINNET: &[(Height, &str)] = &[
    (0, "00000a10f7ce671e773330376ce892a6c0b93fbc05553ebbf659b11e3bf9188d"),
    (57600, "0000000015fedc25afc3db164ef667cc7b86761e430ad2c8348178b35f3a7ae5"),
    (115200, "000000000d48cdef252c47317ff3ec976e6690d8fa16e736162f5660c210cb88"),
    (172800, "000000000029b8da63ad224f0af1d6ae1dda36df76685584cff7b8291425fff9"),
    (230400, "000000000197256fb0a4439f97c158781e4a0c6bbc50943789b6454f30d03737"),
    (288000, "00000000000689e15ee64d18d17bde40a55c9c739d2104487620d9c94fde49a6"),
    (345600, "000000000247734e6bf547ba4bfc0948df0854a8ec2a7e07a6424f9a2867847a"),
    (403200, "0000000004175725c085588b751f1680d02be94e3b620049e0653c1b99a2ad22"),
    (460800, "0000000003d7ffd06b7caa52abfb2b61857fc20023802d3f20c7bfa268e9f0c0"),
    (518400, "00000000050ee93ba705ebb3ebb0b0290d84fcbadc35b2ddfeeb9e2fc45fa9c6"),
    (576000, "000000000513e8d692fc15b90dc217ea6a2ecfb87f8f6008621043c42f11be18"),
    (633600, "000000000547c4c5b882b98bd472fef0417d1f66bab9a38e0b55310420aee65b"),
    (691200, "000000000fe9f5cafc96a1f3217033b4f37a52d1465c16bf866eac6cb6460950"),
    (748800, "0000000028f231274ddafdb2127f1e944685fd4a010a0990605616953690401a"),
    (806400, "000000000607e68c5758df6595f318e70ab1d0f5c6620a11a47873d7fe080686"),
    (864000, "0000000019689b58de02a327a7454ec7faa5cafc71f837bf0b1903386483a3a5"),
    (921600, "00000000456f8a90b5dbbe6b9ba95cf79262cfb51db87b1de517996bf7a9421c"),
    (979200, "000000006860a93401d32538d1454962b6f64834f005d9b3027e770b49a39bbc"),
    (1036800, "00000000a9a5fa171cc3cd81b46e8773d845153310e1a51c63e821537e751395"),
    (1094400, "000000002fac5cfff0c6efb1641662547c0d9046f455236beb8f094a4599dbee"),
    (1121000, "000000012b18631c9d5d90e3c5a32655f63ae1100ff8cafbde184521deba0960"),
    (1135050, "000000014d3dfb1e1a6cfa86d00baf64acd273da8536badc9aaf4f090a9b77af"),
    (2210000, "00000000339ff4df710efe0ff81f4c307343cba44a5a166412b30f764029ef76"),
];

/// Checkpoint table of the test network: its genesis only, never enforced.
pub static TESTNET: &[(Height, &str)] = &[(
    0,
    "00000a10f7ce671e773330376ce892a6c0b93fbc05553ebbf659b11e3bf9188d",
)];

/// Checkpoint table of the regression test network.
pub static REGTEST: &[(Height, &str)] = &[(
    0,
    "35e0eaea93bb51238d310f089a639d92402491b7e27365bb4fb08353ce1e4721",
)];

/// Per-network checkpoint registry.
#[derive(Debug, Clone)]
pub struct Checkpoints {
    network: Network,
    enabled: bool,
    checkpoints: BTreeMap<Height, BlockHash>,
    time_last: i64,
    tx_count_last: u64,
    tx_per_day: f64,
}

impl Checkpoints {
    /// Load the checkpoint data of the given network. `enabled` is the
    /// node's checkpoint-enforcement setting.
    pub fn new(network: Network, enabled: bool) -> Self {
        let (table, time_last, tx_count_last, tx_per_day) = match network {
            Network::Mainnet => (MAINNET, 1496619975, 2644312, 2778.0),
            Network::Testnet => (TESTNET, 1400408750, 0, 100.0),
            Network::Regtest => (REGTEST, 0, 0, 0.0),
        };
        let checkpoints = table
            .iter()
            .map(|(height, hash)| {
                let hash = BlockHash::from_hex(hash).expect("pinned checkpoint is valid hex");
                (*height, hash)
            })
            .collect();

        Self {
            network,
            enabled,
            checkpoints,
            time_last,
            tx_count_last,
            tx_per_day,
        }
    }

    /// Check a block hash against the checkpoint pinned at its height.
    ///
    /// Heights without a pin pass, and so does everything when enforcement
    /// is off or the network carries no enforced checkpoints (testnet,
    /// regtest).
    pub fn check_block(&self, height: Height, hash: &BlockHash) -> bool {
        if self.network != Network::Mainnet {
            return true; // Testnet has no checkpoints.
        }
        if !self.enabled {
            return true;
        }
        match self.checkpoints.get(&height) {
            None => true,
            Some(pinned) if pinned == hash => true,
            Some(pinned) => {
                log::warn!(
                    "block {} at height {} does not match hardened checkpoint {}",
                    hash,
                    height,
                    pinned
                );
                false
            }
        }
    }

    /// A conservative estimate of the chain height, from the highest
    /// checkpoint. Zero when enforcement is off or the network has none.
    pub fn total_blocks_estimate(&self) -> Height {
        if self.network != Network::Mainnet || !self.enabled {
            return 0;
        }
        self.checkpoints.keys().next_back().copied().unwrap_or(0)
    }

    /// The highest checkpoint already present in the caller's block index,
    /// walking the table from the top. `known` tells whether a hash is
    /// indexed.
    pub fn last_checkpoint<F>(&self, known: F) -> Option<(Height, BlockHash)>
    where
        F: Fn(&BlockHash) -> bool,
    {
        if self.network != Network::Mainnet || !self.enabled {
            return None;
        }
        self.checkpoints
            .iter()
            .rev()
            .find(|&(_, hash)| known(hash))
            .map(|(height, hash)| (*height, *hash))
    }

    /// Hash of the highest hardened checkpoint.
    pub fn latest_hardened(&self) -> Option<BlockHash> {
        self.checkpoints.values().next_back().copied()
    }

    /// Estimate how far block verification has progressed, in `[0, 1]`.
    ///
    /// Work is modeled as one unit per transaction up to the last
    /// checkpoint and [`SIGCHECK_VERIFICATION_FACTOR`] units after it.
    /// `tx_count` is the cumulative transaction count at the block being
    /// verified, `block_time` its timestamp and `now` the current time.
    /// Not consensus-critical; plain floating point.
    pub fn guess_verification_progress(&self, tx_count: u64, block_time: i64, now: i64) -> f64 {
        let work_before;
        let work_after;

        if tx_count <= self.tx_count_last {
            let cheap_before = tx_count as f64;
            let cheap_after = (self.tx_count_last - tx_count) as f64;
            let expensive_after = (now - self.time_last) as f64 / 86400.0 * self.tx_per_day;

            work_before = cheap_before;
            work_after = cheap_after + expensive_after * SIGCHECK_VERIFICATION_FACTOR;
        } else {
            let cheap_before = self.tx_count_last as f64;
            let expensive_before = (tx_count - self.tx_count_last) as f64;
            let expensive_after = (now - block_time) as f64 / 86400.0 * self.tx_per_day;

            work_before = cheap_before + expensive_before * SIGCHECK_VERIFICATION_FACTOR;
            work_after = expensive_after * SIGCHECK_VERIFICATION_FACTOR;
        }

        work_before / (work_before + work_after)
    }
}
