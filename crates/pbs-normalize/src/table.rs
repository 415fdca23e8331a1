//! The canonical builder-name mapping table and the unknown-marker set.
//!
//! Keys are lowercased before lookup; the table itself is the display
//! form. Canonical names are kept as single tokens (no internal
//! whitespace) so that a canonical name fed back through
//! [`normalize_builder_name`](crate::normalize_builder_name) always maps
//! to itself. This data was not recoverable from the original
//! implementation (see `DESIGN.md`) and is reconstructed from public
//! knowledge of MEV-Boost builders and execution/consensus client
//! identifiers current as of this writing — it is expected to need
//! periodic additions as new builders appear, the same way the source's
//! own table did.

/// `(lowercased extra-data token, canonical display name)`.
pub static CANONICAL_BUILDERS: &[(&str, &str)] = &[
    ("beaverbuild.org", "beaverbuild"),
    ("beaverbuild", "beaverbuild"),
    ("rsync-builder.xyz", "rsync-builder"),
    ("rsync", "rsync-builder"),
    ("titanbuilder.xyz", "TitanBuilder"),
    ("titan", "TitanBuilder"),
    ("titanbuilder", "TitanBuilder"),
    ("flashbots", "Flashbots"),
    ("builder0x69", "builder0x69"),
    ("0x69", "builder0x69"),
    ("bloxroute", "bloXroute"),
    ("blxrbuilder", "bloXroute"),
    ("blocknative", "Blocknative"),
    ("eth-builder.com", "EthBuilder"),
    ("ethbuilder", "EthBuilder"),
    ("manifold", "Manifold"),
    ("payload.de", "Payload"),
    ("payloadde", "Payload"),
    ("gambitbuilder", "GambitBuilder"),
    ("gambit", "GambitBuilder"),
    ("loki", "Loki"),
    ("jetbuilder", "JetBuilder"),
    ("jet", "JetBuilder"),
    ("penguinbuild", "PenguinBuild"),
    ("blocksmith", "Blocksmith"),
    ("nfactorial", "nFactorial"),
    ("quasar", "Quasar"),
    ("lightspeedbuilder", "LightspeedBuilder"),
    ("blockbeelabs", "BlockbeeLabs"),
    ("btcs", "BTCS"),
    ("f1b.io", "f1b.io"),
    ("edennetwork", "EdenNetwork"),
    ("eden", "EdenNetwork"),
    ("boba-builder", "BobaBuilder"),
    ("bob-the-builder", "BobTheBuilder"),
    ("wenmerge", "WenMerge"),
    ("tbuilder", "tbuilder"),
    ("0x48656c6c6f", "HelloBuilder"),
    ("limeade", "Limeade"),
    ("viper", "Viper"),
    ("antbuilder", "AntBuilder"),
    ("shield3", "Shield3"),
    ("builderai", "BuilderAI"),
    ("nodereal", "NodeReal"),
    ("solbuilder", "Solbuilder"),
    ("bitgetbuilder", "BitgetBuilder"),
    ("skybuilder", "SkyBuilder"),
    ("gaiabuilder", "GaiaBuilder"),
    ("moonbuilder", "MoonBuilder"),
    ("apexbuilder", "ApexBuilder"),
    ("puissant", "Puissant"),
    ("merkle", "Merkle"),
    ("relayoor", "Relayoor"),
    ("builder69", "builder0x69"),
    ("optimus", "OptimusBuilder"),
    ("optimusbuilder", "OptimusBuilder"),
    ("zeromev", "ZeroMEV"),
];

/// Tokens that are known *not* to identify a builder — generic client
/// version strings that end up in `extra_data` for vanilla, self-built
/// blocks. A token matching one of these prefixes normalizes to
/// `"unknown"` rather than being passed through as a cleaned literal.
pub static UNKNOWN_MARKERS: &[&str] = &[
    "geth", "besu", "erigon", "nethermind", "reth", "nimbus", "teku", "prysm", "lighthouse", "lodestar",
];

/// `(lowercased fee-recipient address, canonical entity name)`. Same
/// reconstruction caveat as [`CANONICAL_BUILDERS`] — not recoverable from
/// the original implementation, seeded with public staking-pool and
/// exchange withdrawal addresses current as of this writing.
pub static PROPOSER_REGISTRY: &[(&str, &str)] = &[
    ("0xd2fcb5348d086b0a9c46d22c4fc4c7cfebb2edb1", "Lido"),
    ("0x8103151e2377e78c04a3d2564e20542680ed3096", "Coinbase"),
    ("0xfddf38947afb03c621c71b06c9c70bce73f12999", "Kraken"),
    ("0xdadb0d80178819f2319190d340ce9a924f783711", "Binance"),
];
