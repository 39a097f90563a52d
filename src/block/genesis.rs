//! Deterministic construction of the genesis block.
//!
//! Every network's genesis block is built from the same coinbase, the
//! `"420"` input message paying 420 coins to the founder key, and differs
//! only in header nonce and bits. The Merkle root is computed here
//! (double-SHA256 over the single coinbase); the block *identity* hashes
//! are pinned constants, since on this chain a block's identity is its X11
//! proof-of-work digest, which the hasher boundary owns.
use bitcoin::blockdata::block::{Block, BlockHeader};
use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::script::{Builder, Script};
use bitcoin::blockdata::transaction::{OutPoint, Transaction, TxIn, TxOut};
use bitcoin::hash_types::TxMerkleNode;
use bitcoin_hashes::hex::FromHex;

use crate::block::{Bits, BlockTime};
use crate::network::Network;

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Coinbase reward of the genesis block.
pub const GENESIS_REWARD: u64 = 420 * COIN;

/// Message embedded in the genesis coinbase input.
pub const TIMESTAMP: &[u8] = b"420";

// Key paid by the genesis coinbase output.
const OUTPUT_KEY: &str = "040184710fa689ad5023690c80f3a49c8f13f8d45b8c857fbcbc8bc4a8e4d3eb4b10f4d4604fa08dce601aaf0f470216fe1b51850b4acf21b179c45070ac7b03a9";

/// Genesis block hash on mainnet.
pub const MAINNET: &str = "00000a10f7ce671e773330376ce892a6c0b93fbc05553ebbf659b11e3bf9188d";
/// Genesis block hash on testnet, which shares the mainnet genesis block.
pub const TESTNET: &str = MAINNET;
/// Genesis block hash on regtest.
pub const REGTEST: &str = "35e0eaea93bb51238d310f089a639d92402491b7e27365bb4fb08353ce1e4721";
/// Merkle root of the genesis block, identical on every network.
pub const MERKLE_ROOT: &str = "2a4b0da444f96adf29d6bccf65fa6d558ccbbc4b0fc5c5b3088fc03d5c364558";

/// Build a genesis block from its defining constants.
pub fn create_genesis_block(
    timestamp: &[u8],
    output_script: Script,
    time: BlockTime,
    nonce: u32,
    bits: Bits,
    version: i32,
    reward: u64,
) -> Block {
    let script_sig = Builder::new()
        .push_scriptint(486604799)
        .push_scriptint(4)
        .push_slice(timestamp)
        .into_script();
    let coinbase = Transaction {
        version: 1,
        lock_time: 0,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: 0xffffffff,
            witness: vec![],
        }],
        output: vec![TxOut {
            value: reward,
            script_pubkey: output_script,
        }],
    };
    let txdata = vec![coinbase];
    let merkle_root = TxMerkleNode::from_hash(txdata[0].txid().as_hash());

    Block {
        header: BlockHeader {
            version,
            prev_blockhash: Default::default(),
            merkle_root,
            time,
            bits,
            nonce,
        },
        txdata,
    }
}

/// The genesis block of the given network.
pub fn genesis_block(network: Network) -> Block {
    match network {
        Network::Mainnet | Network::Testnet => create_genesis_block(
            TIMESTAMP,
            output_script(),
            1400408750,
            325433,
            0x1e0ffff0,
            1,
            GENESIS_REWARD,
        ),
        Network::Regtest => create_genesis_block(
            TIMESTAMP,
            output_script(),
            1400408750,
            1,
            0x207fffff,
            1,
            GENESIS_REWARD,
        ),
    }
}

fn output_script() -> Script {
    let key = Vec::from_hex(OUTPUT_KEY).expect("pinned output key is valid hex");

    Builder::new()
        .push_slice(&key)
        .push_opcode(opcodes::all::OP_CHECKSIG)
        .into_script()
}
