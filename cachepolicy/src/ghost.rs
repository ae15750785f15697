use std::collections::HashMap;

/// An address owned by exactly one ghost list
///
/// Entries can't be cloned, so moving an address from one list to another means detaching it
/// first and handing the entry over
#[derive(Debug, Eq, PartialEq)]
pub struct GhostEntry {
    address: u64,
}

impl GhostEntry {
    pub fn new(address: u64) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn into_address(self) -> u64 {
        self.address
    }
}

type NodeId = usize;

// Node 0 is the sentinel, the front of the list is its `next`, the tail its `prev`
const SENTINEL: NodeId = 0;

#[derive(Debug, Clone)]
struct Node {
    address: u64,
    prev: NodeId,
    next: NodeId,
}

/// A recency-ordered list of block addresses, used by ARC to track lines independently of the
/// physical slots they occupy
///
/// Nodes live in an arena and are linked by index, with a sentinel closing the ring. Freed nodes
/// are recycled, so a list that has reached its working size never allocates again. An index from
/// address to node makes lookups and removal from the middle O(1).
#[derive(Debug, Clone)]
pub struct GhostList {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    index: HashMap<u64, NodeId>,
}

impl Default for GhostList {
    fn default() -> Self {
        Self::new()
    }
}

impl GhostList {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node { address: 0, prev: SENTINEL, next: SENTINEL }],
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.index.contains_key(&address)
    }

    pub fn front(&self) -> Option<u64> {
        self.address_of(self.nodes[SENTINEL].next)
    }

    pub fn back(&self) -> Option<u64> {
        self.address_of(self.nodes[SENTINEL].prev)
    }

    /// Takes ownership of an entry and places it at the front
    ///
    /// If the address is already listed it is moved to the front instead, so an address never
    /// appears twice
    pub fn push_front(&mut self, entry: GhostEntry) {
        let address = entry.into_address();
        if let Some(&id) = self.index.get(&address) {
            self.unlink(id);
            self.link_front(id);
            return;
        }
        let id = self.allocate(address);
        self.link_front(id);
        self.index.insert(address, id);
    }

    /// Detaches the entry for an address from wherever it sits in the list
    pub fn remove(&mut self, address: u64) -> Option<GhostEntry> {
        let id = self.index.remove(&address)?;
        self.unlink(id);
        self.free.push(id);
        Some(GhostEntry::new(address))
    }

    /// Detaches the least recent entry
    pub fn pop_back(&mut self) -> Option<GhostEntry> {
        let address = self.back()?;
        self.remove(address)
    }

    /// Moves a listed address to the front, returning false if it isn't listed
    pub fn move_to_front(&mut self, address: u64) -> bool {
        match self.index.get(&address) {
            Some(&id) => {
                self.unlink(id);
                self.link_front(id);
                true
            }
            None => false,
        }
    }

    /// Iterates from most to least recent
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.nodes[SENTINEL].next,
        }
    }

    fn address_of(&self, id: NodeId) -> Option<u64> {
        if id == SENTINEL {
            None
        } else {
            Some(self.nodes[id].address)
        }
    }

    fn allocate(&mut self, address: u64) -> NodeId {
        let node = Node { address, prev: SENTINEL, next: SENTINEL };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn link_front(&mut self, id: NodeId) {
        let old_front = self.nodes[SENTINEL].next;
        self.nodes[id].prev = SENTINEL;
        self.nodes[id].next = old_front;
        self.nodes[old_front].prev = id;
        self.nodes[SENTINEL].next = id;
    }

    fn unlink(&mut self, id: NodeId) {
        let Node { prev, next, .. } = self.nodes[id];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }
}

pub struct Iter<'a> {
    list: &'a GhostList,
    cursor: NodeId,
}

impl<'a> Iterator for Iter<'a> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let address = self.list.address_of(self.cursor)?;
        self.cursor = self.list.nodes[self.cursor].next;
        Some(address)
    }
}

/// The pair of ghost lists kept for one set
///
/// `l1` holds lines seen once since they were brought in, `l2` lines seen at least twice
#[derive(Debug, Clone, Default)]
pub struct GhostLists {
    pub l1: GhostList,
    pub l2: GhostList,
}

impl GhostLists {
    pub fn total_len(&self) -> usize {
        self.l1.len() + self.l2.len()
    }

    /// Detaches an address from whichever list holds it
    pub fn take(&mut self, address: u64) -> Option<GhostEntry> {
        self.l1.remove(address).or_else(|| self.l2.remove(address))
    }
}
