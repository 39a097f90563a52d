//! CannabisCoin peer network. Eg. *Mainnet*.
use std::fmt;
use std::str::FromStr;

use bitcoin::hash_types::BlockHash;
use bitcoin_hashes::hex::FromHex;
use thiserror::Error;

use crate::block::genesis;
use crate::params::Params;

/// The network id string was not recognized.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown network {0:?}")]
pub struct UnknownNetwork(pub String);

/// CannabisCoin peer network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Network {
    /// The live network.
    Mainnet,
    /// The public test network.
    Testnet,
    /// Local regression test network.
    Regtest,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl Network {
    /// Return the short id string of this network, as used in configuration
    /// files and data directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "main",
            Network::Testnet => "test",
            Network::Regtest => "regtest",
        }
    }

    /// DNS seeds. Used to bootstrap the node's address book.
    pub fn seeds(&self) -> &'static [&'static str] {
        match self {
            Network::Mainnet => &["seed.cannabiscoin.net", "seed2.cannabiscoin.net"],
            Network::Testnet => &["testnet-seed.cannabiscoin.net"],
            Network::Regtest => &[], // No seeds.
        }
    }

    /// Get the hash of the genesis block of this network.
    ///
    /// ```
    /// use cann_consensus::network::Network;
    ///
    /// let network = Network::Mainnet;
    /// assert_eq!(network.genesis_hash(), network.params().genesis_hash);
    /// ```
    pub fn genesis_hash(&self) -> BlockHash {
        let hash = match self {
            Network::Mainnet => genesis::MAINNET,
            Network::Testnet => genesis::TESTNET,
            Network::Regtest => genesis::REGTEST,
        };
        BlockHash::from_hex(hash).expect("pinned genesis hash is valid hex")
    }

    /// Get the consensus parameters for this network.
    pub fn params(&self) -> Params {
        crate::params::for_network(*self)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Network::Mainnet),
            "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(UnknownNetwork(other.to_owned())),
        }
    }
}
