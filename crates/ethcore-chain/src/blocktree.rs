//! Multi-branch block graph and best-chain selection.
//!
//! Blocks arrive out of order and from competing branches; the tree keeps
//! every block whose parent is known (or is itself a root), tracks each
//! node's cumulative difficulty, and answers "what's the best block" and
//! "what's the last 256 ancestors for BLOCKHASH" without needing the caller
//! to walk parent pointers by hand.

use ethcore_types::{Hash, Header, U256};
use std::collections::HashMap;

/// BLOCKHASH can only see the 256 most recent ancestors (older ones return
/// zero, per the Yellow Paper).
pub const BLOCKHASH_WINDOW: usize = 256;

struct Node {
    header: Header,
    hash: Hash,
    /// Sum of this block's own difficulty plus every ancestor's, down to the genesis root.
    cumulative_difficulty: U256,
    children: Vec<Hash>,
}

/// A block whose parent hasn't been seen yet. Held until the parent arrives.
#[derive(Debug, Clone)]
pub struct Orphan {
    pub header: Header,
    pub hash: Hash,
}

/// The block graph: every connected block keyed by hash, plus bookkeeping
/// for orphans and the current best tip.
pub struct BlockTree {
    nodes: HashMap<Hash, Node>,
    orphans: Vec<Orphan>,
    best_tip: Hash,
    genesis: Hash,
}

impl BlockTree {
    /// Start a tree rooted at `genesis`.
    pub fn new(genesis: Header) -> Self {
        let hash = crate::rlp::hash_header(&genesis);
        let difficulty = genesis.difficulty;
        let mut nodes = HashMap::new();
        nodes.insert(
            hash,
            Node {
                header: genesis,
                hash,
                cumulative_difficulty: difficulty,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            orphans: Vec::new(),
            best_tip: hash,
            genesis: hash,
        }
    }

    /// Insert a header whose parent is already in the tree. Returns the
    /// inserted block's hash and whether this insertion changed the best tip.
    /// Returns `None` (and queues the header as an orphan) if the parent is unknown.
    pub fn insert(&mut self, header: Header) -> Option<(Hash, bool)> {
        let parent_difficulty = self.nodes.get(&header.parent_hash)?.cumulative_difficulty;
        let hash = crate::rlp::hash_header(&header);
        let cumulative_difficulty = parent_difficulty + header.difficulty;
        let parent_hash = header.parent_hash;

        self.nodes.insert(
            hash,
            Node {
                header,
                hash,
                cumulative_difficulty,
                children: Vec::new(),
            },
        );
        if let Some(parent) = self.nodes.get_mut(&parent_hash) {
            parent.children.push(hash);
        }

        let reorg = self.maybe_adopt(hash, cumulative_difficulty);
        self.try_resolve_orphans();
        Some((hash, reorg))
    }

    /// Queue a header whose parent isn't in the tree yet.
    pub fn insert_orphan(&mut self, header: Header) {
        let hash = crate::rlp::hash_header(&header);
        self.orphans.push(Orphan { header, hash });
    }

    fn try_resolve_orphans(&mut self) {
        loop {
            let ready_index = self
                .orphans
                .iter()
                .position(|o| self.nodes.contains_key(&o.header.parent_hash));
            let Some(index) = ready_index else { break };
            let orphan = self.orphans.remove(index);
            self.insert(orphan.header);
        }
    }

    /// Adopt `candidate` as the new best tip if it beats the current one:
    /// higher cumulative difficulty, tie-broken by lower block number then
    /// lexicographically smaller hash.
    fn maybe_adopt(&mut self, candidate: Hash, candidate_difficulty: U256) -> bool {
        let current = &self.nodes[&self.best_tip];
        let challenger = &self.nodes[&candidate];

        let better = match candidate_difficulty.cmp(&current.cumulative_difficulty) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => match challenger.header.number.cmp(&current.header.number) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => challenger.hash.as_bytes() < current.hash.as_bytes(),
            },
        };

        if better {
            self.best_tip = candidate;
        }
        better
    }

    /// The current best block's header and hash.
    pub fn best_block(&self) -> (&Header, Hash) {
        let node = &self.nodes[&self.best_tip];
        (&node.header, node.hash)
    }

    /// Look up a block by hash.
    pub fn get(&self, hash: &Hash) -> Option<&Header> {
        self.nodes.get(hash).map(|n| &n.header)
    }

    /// `true` if `hash` is an ancestor of the current best tip (i.e. on the
    /// canonical chain), used to answer BLOCKHASH queries.
    pub fn is_canonical(&self, hash: &Hash) -> bool {
        self.canonical_ancestors(BLOCKHASH_WINDOW.max(self.nodes.len()))
            .any(|h| h == *hash)
    }

    /// The up-to-256 most recent ancestor hashes of the best tip, most recent first,
    /// for the BLOCKHASH opcode window.
    pub fn recent_ancestors(&self) -> Vec<Hash> {
        self.canonical_ancestors(BLOCKHASH_WINDOW).collect()
    }

    fn canonical_ancestors(&self, limit: usize) -> impl Iterator<Item = Hash> + '_ {
        let mut current = Some(self.best_tip);
        let mut steps = 0;
        std::iter::from_fn(move || {
            if steps >= limit {
                return None;
            }
            let hash = current?;
            let node = self.nodes.get(&hash)?;
            current = if hash == self.genesis { None } else { Some(node.header.parent_hash) };
            steps += 1;
            Some(hash)
        })
    }

    /// Headers pending because their parent hasn't arrived yet.
    pub fn orphans(&self) -> &[Orphan] {
        &self.orphans
    }
}
