//! Per-network consensus parameters and the process-wide selection.
//!
//! The three parameter sets are constructed once, at first access, and are
//! immutable afterwards with a single exception: the regtest soft-fork
//! deployment windows may be overridden through
//! [`update_regtest_deployment`] before any concurrent reader exists.
use std::sync::RwLock;

use bitcoin::hash_types::TxMerkleNode;
use bitcoin_hashes::hex::FromHex;
use lazy_static::lazy_static;

use crate::block::{genesis, target, Block, BlockHash, Height, Target, Work};
use crate::network::Network;

/// Slots of the BIP9 soft-fork deployment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPos {
    /// Dummy deployment, only ever exercised on test chains.
    TestDummy = 0,
    /// Relative lock-time rules (BIP68, BIP112, BIP113).
    Csv = 1,
    /// Segregated witness (BIP141, BIP143, BIP147).
    Segwit = 2,
}

/// Number of slots in the deployment table.
pub const MAX_VERSION_BITS_DEPLOYMENTS: usize = 3;

/// Activation window of a BIP9 soft-fork deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BIP9Deployment {
    /// Version bit signalling the deployment.
    pub bit: u8,
    /// Start of the signalling period, seconds since epoch.
    pub start_time: i64,
    /// End of the signalling period, seconds since epoch.
    pub timeout: i64,
}

/// Parameters that influence chain consensus, fixed per network.
#[derive(Debug, Clone)]
pub struct Params {
    /// Network these parameters are valid for.
    pub network: Network,
    /// Blocks between subsidy halvings.
    pub subsidy_halving_interval: u32,
    /// Block-version majority required to enforce an upgrade.
    pub majority_enforce_block_upgrade: u32,
    /// Block-version majority past which outdated blocks are rejected.
    pub majority_reject_block_outdated: u32,
    /// Window, in blocks, over which the version majorities are counted.
    pub majority_window: u32,
    /// Easiest (largest) target allowed on this network.
    pub pow_limit: Target,
    /// Intended retarget window, in seconds.
    pub pow_target_timespan: u64,
    /// Intended seconds between blocks.
    pub pow_target_spacing: u64,
    /// Whether blocks may fall back to the previous difficulty.
    pub allow_min_difficulty_blocks: bool,
    /// Whether retargeting is disabled altogether (regtest).
    pub no_pow_retargeting: bool,
    /// Signalling blocks required within a confirmation window to lock in
    /// a deployment.
    pub rule_change_activation_threshold: u32,
    /// Blocks per BIP9 confirmation window.
    pub miner_confirmation_window: u32,
    /// Height of the first scheduled consensus fork.
    pub fork_one: Height,
    /// Height of the second scheduled consensus fork.
    pub fork_two: Height,
    /// BIP9 deployment table, indexed by [`DeploymentPos`].
    pub deployments: [BIP9Deployment; MAX_VERSION_BITS_DEPLOYMENTS],
    /// Cumulative work the best chain is expected to carry at minimum.
    pub minimum_chain_work: Work,
    /// Public key entitled to sign broadcast checkpoints.
    pub checkpoint_pub_key: &'static str,
    /// Wire protocol message prefix.
    pub message_start: [u8; 4],
    /// Default peer-to-peer listen port.
    pub default_port: u16,
    /// Height before which block files are never pruned.
    pub prune_after_height: Height,
    /// Base58 version byte of pay-to-pubkey-hash addresses.
    pub base58_pubkey_address_prefix: u8,
    /// Base58 version byte of pay-to-script-hash addresses.
    pub base58_script_address_prefix: u8,
    /// Base58 version byte of private keys.
    pub base58_secret_key_prefix: u8,
    /// BIP32 extended public key version bytes.
    pub ext_public_key_prefix: [u8; 4],
    /// BIP32 extended secret key version bytes.
    pub ext_secret_key_prefix: [u8; 4],
    /// The network's genesis block.
    pub genesis: Block,
    /// Pinned identity hash of the genesis block.
    pub genesis_hash: BlockHash,
}

impl Params {
    /// Construct the parameter set of the given network.
    ///
    /// Aborts if the constructed genesis block does not reproduce its
    /// pinned Merkle root: that means a corrupted consensus constant, and
    /// nothing downstream can be trusted.
    pub fn new(network: Network) -> Self {
        let genesis = genesis::genesis_block(network);
        assert_eq!(
            genesis.header.merkle_root,
            TxMerkleNode::from_hex(genesis::MERKLE_ROOT).expect("pinned merkle root is valid hex"),
            "corrupted genesis merkle root on {}",
            network,
        );
        let genesis_hash = network.genesis_hash();

        let params = match network {
            Network::Mainnet => Params {
                network,
                subsidy_halving_interval: 3_000_000,
                majority_enforce_block_upgrade: 750,
                majority_reject_block_outdated: 950,
                majority_window: 1000,
                pow_limit: uint256(
                    "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                ),
                pow_target_timespan: 24 * 60 * 60, // one day
                pow_target_spacing: 42,
                allow_min_difficulty_blocks: false,
                no_pow_retargeting: false,
                rule_change_activation_threshold: 21_600, // 75% of 28800
                miner_confirmation_window: 28_800,
                fork_one: 2_282_000,
                fork_two: 3_030_000,
                deployments: [
                    BIP9Deployment {
                        bit: 28,
                        start_time: 1199145601, // January 1, 2008
                        timeout: 1230767999,    // December 31, 2008
                    },
                    BIP9Deployment {
                        bit: 0,
                        start_time: 1533081600, // August 1, 2018
                        timeout: 1564617600,    // August 1, 2019
                    },
                    BIP9Deployment {
                        bit: 1,
                        start_time: 1533081600,
                        timeout: 1564617600,
                    },
                ],
                minimum_chain_work: uint256(
                    "0x0000000000000000000000000000000000000000000000000000000000100010",
                ),
                checkpoint_pub_key: "048058d4b29ae51a2b7fe4276c7cc32b2c4353920af721d12c4b5e6ec7aff8c4d8bc9873ce066f8bbf86d5bb835600885c1a2a7a376496c7099afae5146932562e",
                message_start: [0xfe, 0xc3, 0xb9, 0xde],
                default_port: 39348,
                prune_after_height: 100_000,
                base58_pubkey_address_prefix: 28,
                base58_script_address_prefix: 5,
                base58_secret_key_prefix: 156,
                ext_public_key_prefix: [0x04, 0x88, 0xb2, 0x1e],
                ext_secret_key_prefix: [0x04, 0x88, 0xad, 0xe4],
                genesis,
                genesis_hash,
            },
            Network::Testnet => Params {
                network,
                subsidy_halving_interval: 3_000_000,
                majority_enforce_block_upgrade: 51,
                majority_reject_block_outdated: 75,
                majority_window: 100,
                pow_limit: uint256(
                    "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                ),
                pow_target_timespan: 24 * 60 * 60,
                pow_target_spacing: 42,
                allow_min_difficulty_blocks: true,
                no_pow_retargeting: false,
                rule_change_activation_threshold: 2160,
                miner_confirmation_window: 2880,
                fork_one: 1500,
                fork_two: 0,
                deployments: [
                    BIP9Deployment {
                        bit: 28,
                        start_time: 1199145601,
                        timeout: 1230767999,
                    },
                    BIP9Deployment {
                        bit: 0,
                        start_time: 1533081600,
                        timeout: 1564617600,
                    },
                    BIP9Deployment {
                        bit: 1,
                        start_time: 1533081600,
                        timeout: 1564617600,
                    },
                ],
                minimum_chain_work: uint256(
                    "0x0000000000000000000000000000000000000000000000000000000000100010",
                ),
                checkpoint_pub_key: "048dc3106fba17f0bcefb289f14a8e248e210ae6f96cc2e512b84ba88f9bc08669078a9e4d0144d6573d035a62d84224f380427d2cbdb763da56aeac6cf50b13e3",
                message_start: [0xfe, 0xc4, 0xba, 0xde],
                default_port: 29347,
                prune_after_height: 1000,
                base58_pubkey_address_prefix: 111,
                base58_script_address_prefix: 196,
                base58_secret_key_prefix: 239,
                ext_public_key_prefix: [0x04, 0x35, 0x87, 0xcf],
                ext_secret_key_prefix: [0x04, 0x35, 0x83, 0x94],
                genesis,
                genesis_hash,
            },
            Network::Regtest => Params {
                network,
                subsidy_halving_interval: 150,
                majority_enforce_block_upgrade: 750,
                majority_reject_block_outdated: 950,
                majority_window: 1000,
                pow_limit: uint256(
                    "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                ),
                pow_target_timespan: 24 * 60 * 60,
                pow_target_spacing: 42,
                allow_min_difficulty_blocks: true,
                no_pow_retargeting: true,
                rule_change_activation_threshold: 108, // 75% for testchains
                miner_confirmation_window: 144,
                fork_one: 1,
                fork_two: 0,
                deployments: [
                    BIP9Deployment {
                        bit: 28,
                        start_time: 0,
                        timeout: 999999999999,
                    },
                    BIP9Deployment {
                        bit: 0,
                        start_time: 0,
                        timeout: 999999999999,
                    },
                    BIP9Deployment {
                        bit: 1,
                        start_time: 0,
                        timeout: 999999999999,
                    },
                ],
                minimum_chain_work: uint256("0x00"),
                checkpoint_pub_key: "048dc3106fba17f0bcefb289f14a8e248e210ae6f96cc2e512b84ba88f9bc08669078a9e4d0144d6573d035a62d84224f380427d2cbdb763da56aeac6cf50b13e3",
                message_start: [0xfa, 0xbf, 0xb5, 0xda],
                default_port: 29347,
                prune_after_height: 1000,
                base58_pubkey_address_prefix: 111,
                base58_script_address_prefix: 196,
                base58_secret_key_prefix: 239,
                ext_public_key_prefix: [0x04, 0x35, 0x87, 0xcf],
                ext_secret_key_prefix: [0x04, 0x35, 0x83, 0x94],
                genesis,
                genesis_hash,
            },
        };

        debug_assert!(params.pow_target_spacing > 0);
        debug_assert!(params.pow_target_timespan >= 4 * params.pow_target_spacing);

        params
    }
}

// Transcribes a pinned hex constant.
fn uint256(hex: &str) -> Target {
    target::from_hex(hex).expect("pinned 256-bit constant is valid hex")
}

struct Registry {
    mainnet: Params,
    testnet: Params,
    regtest: Params,
    selected: Option<Network>,
}

impl Registry {
    fn get(&self, network: Network) -> &Params {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
            Network::Regtest => &self.regtest,
        }
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<Registry> = RwLock::new(Registry {
        mainnet: Params::new(Network::Mainnet),
        testnet: Params::new(Network::Testnet),
        regtest: Params::new(Network::Regtest),
        selected: None,
    });
}

/// Select the parameter set the process operates on.
pub fn select_params(network: Network) {
    let mut registry = REGISTRY.write().expect("params registry is not poisoned");
    registry.selected = Some(network);

    log::info!("Selected {} network parameters", network);
}

/// The currently selected parameter set.
///
/// Panics if [`select_params`] has not run: reading parameters before
/// selection is a programmer error.
pub fn params() -> Params {
    let registry = REGISTRY.read().expect("params registry is not poisoned");
    let network = registry
        .selected
        .expect("select_params must be called before reading params");

    registry.get(network).clone()
}

/// The parameter set of the given network, independent of selection.
pub fn for_network(network: Network) -> Params {
    let registry = REGISTRY.read().expect("params registry is not poisoned");

    registry.get(network).clone()
}

/// Override a regtest soft-fork deployment window.
///
/// Only regtest is mutable; call before any concurrent reader exists.
/// Intended for tests.
pub fn update_regtest_deployment(pos: DeploymentPos, start_time: i64, timeout: i64) {
    let mut registry = REGISTRY.write().expect("params registry is not poisoned");
    let deployment = &mut registry.regtest.deployments[pos as usize];

    deployment.start_time = start_time;
    deployment.timeout = timeout;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_constants() {
        let mainnet = Params::new(Network::Mainnet);
        assert_eq!(target::to_compact(mainnet.pow_limit), 0x1e0fffff);
        assert_eq!(mainnet.message_start, [0xfe, 0xc3, 0xb9, 0xde]);
        assert_eq!(mainnet.default_port, 39348);
        assert_eq!(mainnet.pow_target_timespan, 86_400);
        assert_eq!(mainnet.pow_target_spacing, 42);
        assert_eq!(mainnet.genesis.header.bits, 0x1e0ffff0);
        assert_eq!(mainnet.genesis.header.nonce, 325_433);
        assert_eq!(mainnet.deployments[DeploymentPos::Segwit as usize].bit, 1);
        assert!(!mainnet.allow_min_difficulty_blocks);

        let testnet = Params::new(Network::Testnet);
        assert_eq!(testnet.message_start, [0xfe, 0xc4, 0xba, 0xde]);
        assert_eq!(testnet.default_port, 29347);
        assert!(testnet.allow_min_difficulty_blocks);
        assert!(!testnet.no_pow_retargeting);
        assert_eq!(testnet.genesis_hash, Network::Mainnet.genesis_hash());

        let regtest = Params::new(Network::Regtest);
        assert_eq!(target::to_compact(regtest.pow_limit), 0x207fffff);
        assert_eq!(regtest.message_start, [0xfa, 0xbf, 0xb5, 0xda]);
        assert!(regtest.no_pow_retargeting);
        assert_eq!(regtest.genesis.header.nonce, 1);
        assert_eq!(regtest.genesis.header.bits, 0x207fffff);
        assert_eq!(regtest.minimum_chain_work, Target::default());
    }

    #[test]
    fn test_pow_limit_bounds_genesis_bits() {
        for network in &[Network::Mainnet, Network::Testnet, Network::Regtest] {
            let params = Params::new(*network);
            let (genesis_target, negative, overflow) =
                target::from_compact(params.genesis.header.bits);
            assert!(!negative && !overflow);
            assert!(genesis_target <= params.pow_limit);
        }
    }

    #[test]
    fn test_registry() {
        // Single test for everything touching the shared registry, since
        // tests run concurrently.
        let before = for_network(Network::Regtest);
        assert_eq!(
            before.deployments[DeploymentPos::TestDummy as usize].start_time,
            0
        );

        select_params(Network::Testnet);
        assert_eq!(params().network, Network::Testnet);
        assert_eq!(params().default_port, 29347);

        update_regtest_deployment(DeploymentPos::TestDummy, 100, 200);
        let regtest = for_network(Network::Regtest);
        assert_eq!(
            regtest.deployments[DeploymentPos::TestDummy as usize],
            BIP9Deployment {
                bit: 28,
                start_time: 100,
                timeout: 200
            }
        );

        // Mainnet and testnet stay immutable.
        let mainnet = for_network(Network::Mainnet);
        assert_eq!(
            mainnet.deployments[DeploymentPos::TestDummy as usize].start_time,
            1199145601
        );

        select_params(Network::Mainnet);
        assert_eq!(params().network, Network::Mainnet);
    }
}
