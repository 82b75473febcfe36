//! In-memory representation of the phenotype ontology.
//!
//! The ontology is materialized once at load time: terms live in a dense
//! arena indexed by `u32`, each term carries its parent links plus a
//! precomputed set of all ancestors (including itself).  Subclass tests and
//! ancestor lookups thereafter are binary searches on sorted ID vectors,
//! without any per-query graph traversal.

use std::collections::{HashMap, VecDeque};

mod group;

pub use group::TermGroup;

/// The root of the subtree of clinically observable findings, `HP:0000118`.
pub const PHENOTYPIC_ABNORMALITY: TermId = TermId::from_u32(118);

/// The ID of an ontology term (e.g. `HP:0000118`).
///
/// Only the numeric part is stored; the `HP:` prefix is implied.
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TermId {
    inner: u32,
}

impl TermId {
    /// Creates a new `TermId` from a `u32` integer.
    pub const fn from_u32(inner: u32) -> Self {
        TermId { inner }
    }

    /// Returns the numeric part of the ID.
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for TermId {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let numeric = s
            .strip_prefix("HP:")
            .ok_or_else(|| anyhow::anyhow!("term ID {:?} does not start with \"HP:\"", s))?;
        Ok(TermId {
            inner: numeric
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("term ID {:?} is not numeric: {}", s, e))?,
        })
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HP:{:07}", self.inner)
    }
}

impl std::fmt::Debug for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TermId({self})")
    }
}

impl serde::Serialize for TermId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for TermId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        TermId::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

/// A term as stored in the arena.
#[derive(Debug)]
struct TermInternal {
    id: TermId,
    name: String,
    /// Dense indices of the direct parents, in the order they were declared.
    parents: Vec<u32>,
    /// All ancestors of the term, including the term itself.
    ancestors: TermGroup,
}

/// The phenotype ontology: a DAG of terms rooted at
/// [`PHENOTYPIC_ABNORMALITY`].
///
/// Construction goes through [`OntologyBuilder`]; afterwards the ontology
/// is immutable and can be shared read-only across evaluations.
#[derive(Debug, Default)]
pub struct Ontology {
    terms: Vec<TermInternal>,
    index: HashMap<TermId, u32>,
    alternates: HashMap<TermId, TermId>,
    version: Option<String>,
}

impl Ontology {
    /// Returns the number of (primary) terms in the ontology.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the ontology contains no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The data version recorded at load time, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Resolves a term ID to its primary ID via the alias table.
    ///
    /// Returns `None` if the ID is neither a primary term nor a known
    /// alternate ID.
    pub fn primary_id(&self, term: TermId) -> Option<TermId> {
        if self.index.contains_key(&term) {
            Some(term)
        } else {
            self.alternates.get(&term).copied()
        }
    }

    /// Returns the name of the term, if present.
    pub fn name(&self, term: TermId) -> Option<&str> {
        self.idx(term)
            .map(|idx| self.terms[idx as usize].name.as_str())
    }

    /// Returns the set of all ancestors of `term`, including `term` itself.
    ///
    /// `None` if the term is unknown (after alias resolution).
    pub fn ancestors(&self, term: TermId) -> Option<&TermGroup> {
        self.idx(term)
            .map(|idx| &self.terms[idx as usize].ancestors)
    }

    /// Returns `true` if `child` is `parent` or a (transitive) subclass of
    /// `parent`.
    ///
    /// Unknown terms are never subclasses of anything.
    pub fn is_subclass(&self, child: TermId, parent: TermId) -> bool {
        let Some(parent) = self.primary_id(parent) else {
            return false;
        };
        self.ancestors(child)
            .map(|ancs| ancs.contains(&parent))
            .unwrap_or(false)
    }

    /// Direct parents of `term` in declaration order.
    pub fn parents_of(&self, term: TermId) -> Vec<TermId> {
        match self.idx(term) {
            Some(idx) => self.terms[idx as usize]
                .parents
                .iter()
                .map(|&p| self.terms[p as usize].id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Walks from `term` up to the root, breadth-first, and returns the
    /// terms in visit order.  `term` itself is at position 0.
    ///
    /// Parents are visited in declaration order, so the result is
    /// deterministic for a fixed ontology.
    pub fn path_to_root(&self, term: TermId) -> Vec<TermId> {
        let Some(start) = self.idx(term) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.terms.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        visited[start as usize] = true;
        queue.push_back(start);
        while let Some(idx) = queue.pop_front() {
            order.push(self.terms[idx as usize].id);
            for &parent in &self.terms[idx as usize].parents {
                if !visited[parent as usize] {
                    visited[parent as usize] = true;
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    /// Iterates over all (primary) term IDs in the ontology.
    pub fn term_ids(&self) -> impl Iterator<Item = TermId> + '_ {
        self.terms.iter().map(|t| t.id)
    }

    fn idx(&self, term: TermId) -> Option<u32> {
        self.primary_id(term)
            .and_then(|primary| self.index.get(&primary).copied())
    }
}

/// One term declaration handed to the builder.
#[derive(Debug, Clone)]
struct RawTerm {
    id: TermId,
    name: String,
    parents: Vec<TermId>,
    alt_ids: Vec<TermId>,
}

/// Builder for [`Ontology`].
///
/// Declare all terms with their parent links first, then call
/// [`OntologyBuilder::build`] which resolves the graph, precomputes the
/// ancestor sets, and validates that the result is a DAG rooted at
/// [`PHENOTYPIC_ABNORMALITY`].
#[derive(Debug, Default)]
pub struct OntologyBuilder {
    terms: Vec<RawTerm>,
    version: Option<String>,
}

impl OntologyBuilder {
    /// Creates a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the data version (e.g. an ontology release date).
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Declares a term with its direct parents.
    pub fn term(self, id: TermId, name: &str, parents: &[TermId]) -> Self {
        self.term_with_alternates(id, name, parents, &[])
    }

    /// Declares a term with its direct parents and alternate (obsolete) IDs.
    pub fn term_with_alternates(
        mut self,
        id: TermId,
        name: &str,
        parents: &[TermId],
        alt_ids: &[TermId],
    ) -> Self {
        self.terms.push(RawTerm {
            id,
            name: name.to_string(),
            parents: parents.to_vec(),
            alt_ids: alt_ids.to_vec(),
        });
        self
    }

    /// Resolves all declarations into an immutable [`Ontology`].
    ///
    /// Fails on duplicate IDs, unknown parents, cycles, and terms that are
    /// not reachable from the root.
    pub fn build(self) -> Result<Ontology, anyhow::Error> {
        let mut index: HashMap<TermId, u32> = HashMap::with_capacity(self.terms.len());
        for (i, raw) in self.terms.iter().enumerate() {
            if index.insert(raw.id, i as u32).is_some() {
                anyhow::bail!("duplicate term ID {}", raw.id);
            }
        }

        let mut alternates: HashMap<TermId, TermId> = HashMap::new();
        for raw in &self.terms {
            for &alt in &raw.alt_ids {
                if index.contains_key(&alt) {
                    anyhow::bail!("alternate ID {} collides with a primary term", alt);
                }
                if let Some(previous) = alternates.insert(alt, raw.id) {
                    if previous != raw.id {
                        anyhow::bail!("alternate ID {} maps to both {} and {}", alt, previous, raw.id);
                    }
                }
            }
        }

        let mut terms: Vec<TermInternal> = Vec::with_capacity(self.terms.len());
        for raw in &self.terms {
            let mut parents = Vec::with_capacity(raw.parents.len());
            for &parent in &raw.parents {
                let primary = if index.contains_key(&parent) {
                    parent
                } else {
                    *alternates
                        .get(&parent)
                        .ok_or_else(|| anyhow::anyhow!("term {} has unknown parent {}", raw.id, parent))?
                };
                parents.push(index[&primary]);
            }
            terms.push(TermInternal {
                id: raw.id,
                name: raw.name.clone(),
                parents,
                ancestors: TermGroup::new(),
            });
        }

        // Compute ancestor sets with an explicit DFS stack; a term that is
        // revisited while still on the stack closes a cycle.
        const UNVISITED: u8 = 0;
        const IN_PROGRESS: u8 = 1;
        const DONE: u8 = 2;
        let mut state = vec![UNVISITED; terms.len()];
        let mut ancestors: Vec<TermGroup> = vec![TermGroup::new(); terms.len()];
        for start in 0..terms.len() {
            if state[start] == DONE {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = IN_PROGRESS;
            while let Some((idx, next_parent)) = stack.pop() {
                if next_parent < terms[idx].parents.len() {
                    let parent = terms[idx].parents[next_parent] as usize;
                    stack.push((idx, next_parent + 1));
                    match state[parent] {
                        IN_PROGRESS => {
                            anyhow::bail!("cycle detected at term {}", terms[parent].id)
                        }
                        UNVISITED => {
                            state[parent] = IN_PROGRESS;
                            stack.push((parent, 0));
                        }
                        _ => (),
                    }
                } else {
                    let mut ancs = TermGroup::new();
                    ancs.insert(terms[idx].id);
                    for &parent in &terms[idx].parents {
                        let parent_ancs = ancestors[parent as usize].clone();
                        ancs.extend_from(&parent_ancs);
                    }
                    ancestors[idx] = ancs;
                    state[idx] = DONE;
                }
            }
        }
        for (term, ancs) in terms.iter_mut().zip(ancestors) {
            term.ancestors = ancs;
        }

        if !index.contains_key(&PHENOTYPIC_ABNORMALITY) {
            anyhow::bail!("ontology does not contain the root term {}", PHENOTYPIC_ABNORMALITY);
        }
        for term in &terms {
            if !term.ancestors.contains(&PHENOTYPIC_ABNORMALITY) {
                anyhow::bail!("term {} is not reachable from the root {}", term.id, PHENOTYPIC_ABNORMALITY);
            }
        }

        Ok(Ontology {
            terms,
            index,
            alternates,
            version: self.version,
        })
    }
}
