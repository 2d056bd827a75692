//! Triple arena and execution-order chains
//!
//! A chain is a circular doubly-linked list threaded through the arena and headed by a
//! sentinel triple, so every splice primitive is O(1) and an empty chain is a head linked to
//! itself.

use super::instruction::{JumpTarget, Opcode, Operand, ResultSlot, Triple, TripleRef};

/// Handle of a chain: its sentinel head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(TripleRef);

impl ChainId {
    /// The sentinel triple
    pub fn head(self) -> TripleRef {
        self.0
    }
}

/// Owner of every triple generated for a compilation unit
#[derive(Debug, Clone, Default)]
pub struct TripleArena {
    triples: Vec<Triple>,
    results: Vec<Operand>,
}

impl TripleArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triples ever made, heads included
    pub fn triple_count(&self) -> usize {
        self.triples.len()
    }

    /// Create an empty chain
    pub fn new_chain(&mut self) -> ChainId {
        let head = self.push(Triple::new(Opcode::ChainHead, (0, 0)));
        let node = &mut self.triples[head.index()];
        node.prev = Some(head);
        node.next = Some(head);
        ChainId(head)
    }

    /// Create an unlinked triple
    pub fn make_triple(&mut self, opcode: Opcode, src: (usize, usize)) -> TripleRef {
        self.push(Triple::new(opcode, src))
    }

    fn push(&mut self, triple: Triple) -> TripleRef {
        let t = TripleRef(self.triples.len() as u32);
        self.triples.push(triple);
        t
    }

    /// Borrow a triple
    pub fn get(&self, t: TripleRef) -> &Triple {
        &self.triples[t.index()]
    }

    /// Opcode of a triple
    pub fn opcode(&self, t: TripleRef) -> Opcode {
        self.get(t).opcode
    }

    /// Change the opcode of a triple
    pub fn set_opcode(&mut self, t: TripleRef, opcode: Opcode) {
        self.triples[t.index()].opcode = opcode;
    }

    /// Operand `i` (0 or 1) of a triple
    pub fn operand(&self, t: TripleRef, i: usize) -> Operand {
        self.get(t).operands[i]
    }

    /// Set operand `i` (0 or 1) of a triple
    pub fn set_operand(&mut self, t: TripleRef, i: usize, operand: Operand) {
        self.triples[t.index()].operands[i] = operand;
    }

    /// True when the triple sits on some chain
    pub fn is_linked(&self, t: TripleRef) -> bool {
        self.get(t).prev.is_some()
    }

    /// First triple of a chain
    pub fn first(&self, chain: ChainId) -> Option<TripleRef> {
        self.successor(chain, chain.head())
    }

    /// Last triple of a chain
    pub fn last(&self, chain: ChainId) -> Option<TripleRef> {
        self.get(chain.head()).prev.filter(|t| *t != chain.head())
    }

    /// Last triple of a chain, or its head when empty
    pub fn last_or_head(&self, chain: ChainId) -> TripleRef {
        self.last(chain).unwrap_or(chain.head())
    }

    /// Triple following `t` on `chain`
    pub fn successor(&self, chain: ChainId, t: TripleRef) -> Option<TripleRef> {
        self.get(t).next.filter(|n| *n != chain.head())
    }

    /// Triple preceding `t` on `chain`
    pub fn predecessor(&self, chain: ChainId, t: TripleRef) -> Option<TripleRef> {
        self.get(t).prev.filter(|p| *p != chain.head())
    }

    /// Link an unlinked triple directly after `cursor`
    pub fn insert_after(&mut self, cursor: TripleRef, t: TripleRef) {
        debug_assert!(!self.is_linked(t), "triple already on a chain");
        let Some(after) = self.get(cursor).next else {
            return;
        };
        {
            let node = &mut self.triples[t.index()];
            node.prev = Some(cursor);
            node.next = Some(after);
        }
        self.triples[cursor.index()].next = Some(t);
        self.triples[after.index()].prev = Some(t);
    }

    /// Link an unlinked triple directly before `cursor`
    pub fn insert_before(&mut self, cursor: TripleRef, t: TripleRef) {
        if let Some(prev) = self.get(cursor).prev {
            self.insert_after(prev, t);
        }
    }

    /// Link an unlinked triple at the tail of `chain`
    pub fn append(&mut self, chain: ChainId, t: TripleRef) {
        let tail = self.last_or_head(chain);
        self.insert_after(tail, t);
    }

    /// Unlink a triple from whatever chain holds it
    pub fn detach(&mut self, t: TripleRef) {
        let (Some(prev), Some(next)) = (self.get(t).prev, self.get(t).next) else {
            debug_assert!(false, "detaching an unlinked triple");
            return;
        };
        self.triples[prev.index()].next = Some(next);
        self.triples[next.index()].prev = Some(prev);
        let node = &mut self.triples[t.index()];
        node.prev = None;
        node.next = None;
        tracing::trace!(triple = t.0, "detached triple");
    }

    /// Move the whole of `src` directly after `cursor`, in order, leaving `src` empty
    pub fn splice_after(&mut self, cursor: TripleRef, src: ChainId) {
        let (Some(first), Some(last)) = (self.first(src), self.last(src)) else {
            return;
        };
        let Some(after) = self.get(cursor).next else {
            return;
        };
        self.triples[cursor.index()].next = Some(first);
        self.triples[first.index()].prev = Some(cursor);
        self.triples[last.index()].next = Some(after);
        self.triples[after.index()].prev = Some(last);

        let head = &mut self.triples[src.head().index()];
        head.prev = Some(src.head());
        head.next = Some(src.head());
        tracing::trace!(after = cursor.0, first = first.0, last = last.0, "spliced chain");
    }

    /// Move the whole of `src` to the end of `dest`
    pub fn splice(&mut self, dest: ChainId, src: ChainId) {
        let tail = self.last_or_head(dest);
        self.splice_after(tail, src);
    }

    /// Walk a chain in execution order
    pub fn iter(&self, chain: ChainId) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            chain,
            cursor: chain.head(),
        }
    }

    /// Number of triples on a chain
    pub fn len(&self, chain: ChainId) -> usize {
        self.iter(chain).count()
    }

    /// True when the chain holds no triple
    pub fn is_empty(&self, chain: ChainId) -> bool {
        self.first(chain).is_none()
    }

    /// Reserve a result slot
    pub fn new_result_slot(&mut self) -> ResultSlot {
        self.results.push(Operand::None);
        ResultSlot(self.results.len() as u32 - 1)
    }

    /// Fill a result slot
    pub fn fill_result(&mut self, slot: ResultSlot, value: Operand) {
        self.results[slot.0 as usize] = value;
    }

    /// Content of a result slot
    pub fn result(&self, slot: ResultSlot) -> Operand {
        self.results[slot.0 as usize]
    }

    /// Turn every `NextAfter` destination on `chain` into a concrete triple
    ///
    /// A jump past the last triple lands on a `Noop` appended for the purpose.
    /// Returns the number of jumps resolved.
    pub fn resolve_jumps(&mut self, chain: ChainId) -> usize {
        let jumps: Vec<TripleRef> = self
            .iter(chain)
            .filter(|t| self.opcode(*t).is_jump())
            .collect();
        let mut landing: Option<TripleRef> = None;
        let mut resolved = 0;
        for jump in jumps {
            let Operand::Jump(JumpTarget::NextAfter(anchor)) = self.operand(jump, 0) else {
                continue;
            };
            let dest = match (self.successor(chain, anchor), landing) {
                (Some(dest), _) => dest,
                (None, Some(pad)) => pad,
                (None, None) => {
                    let pad = self.make_triple(Opcode::Noop, self.get(anchor).src);
                    self.append(chain, pad);
                    landing = Some(pad);
                    pad
                }
            };
            self.set_operand(jump, 0, Operand::Jump(JumpTarget::Resolved(dest)));
            resolved += 1;
        }
        resolved
    }
}

/// Iterator over a chain
pub struct ChainIter<'a> {
    arena: &'a TripleArena,
    chain: ChainId,
    cursor: TripleRef,
}

impl Iterator for ChainIter<'_> {
    type Item = TripleRef;

    fn next(&mut self) -> Option<TripleRef> {
        let next = self.arena.successor(self.chain, self.cursor)?;
        self.cursor = next;
        Some(next)
    }
}
