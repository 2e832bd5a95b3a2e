use std::{fmt::Display, str::FromStr};

use super::parser::{to_postfix, Token};
use crate::Error;

/// Policy trees deeper than this are rejected, a single leaf having depth 0.
pub const MAX_POLICY_DEPTH: usize = 256;

/// Read-only view of a threshold tree.
///
/// Implemented by the plain access structure and by the ciphertext tree, so
/// that both share the satisfaction and selection logic. A node is a leaf
/// iff it carries an attribute.
pub trait ThresholdTree: Sized {
    /// Attribute of a leaf, `None` for a threshold node.
    fn attribute(&self) -> Option<&str>;

    /// Threshold of the node, `1` for a leaf.
    fn threshold(&self) -> usize;

    /// Ordered children, empty for a leaf.
    fn children(&self) -> &[Self];

    /// Returns `true` if the attributes known to `lookup` satisfy this tree.
    ///
    /// `lookup` maps an attribute to the index of the matching key component.
    fn is_satisfied(&self, lookup: &impl Fn(&str) -> Option<usize>) -> bool {
        match self.attribute() {
            Some(attribute) => lookup(attribute).is_some(),
            None => {
                self.children()
                    .iter()
                    .filter(|child| child.is_satisfied(lookup))
                    .count()
                    >= self.threshold()
            }
        }
    }

    /// Selects a satisfying subset of leaves of minimal size, or returns
    /// `None` if the tree is not satisfied.
    ///
    /// At each threshold node the `k` satisfied children with the fewest
    /// leaves are chosen, ties going to the lowest child index.
    fn pick_min_leaves(&self, lookup: &impl Fn(&str) -> Option<usize>) -> Option<Selection> {
        if let Some(attribute) = self.attribute() {
            return lookup(attribute).map(|component| Selection::Leaf { component });
        }

        let k = self.threshold();
        let mut candidates = self
            .children()
            .iter()
            .enumerate()
            .filter_map(|(i, child)| child.pick_min_leaves(lookup).map(|s| (i + 1, s)))
            .collect::<Vec<_>>();
        if candidates.len() < k {
            return None;
        }

        // stable sort: equal costs keep the child order
        candidates.sort_by_key(|(_, selection)| selection.leaf_count());
        candidates.truncate(k);
        candidates.sort_by_key(|(index, _)| *index);

        let leaf_count = candidates.iter().map(|(_, s)| s.leaf_count()).sum();
        Some(Selection::Threshold {
            leaf_count,
            chosen: candidates,
        })
    }

    /// Number of leaves of the tree.
    fn leaf_count(&self) -> usize {
        match self.attribute() {
            Some(_) => 1,
            None => self.children().iter().map(Self::leaf_count).sum(),
        }
    }
}

/// Leaves chosen to satisfy a threshold tree.
///
/// Built per decryption attempt, the tree it was computed from is never
/// modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A satisfied leaf and the index of the matching key component.
    Leaf { component: usize },
    /// The chosen children of a threshold node, as `(1-based index,
    /// selection)` pairs sorted by index.
    Threshold {
        leaf_count: usize,
        chosen: Vec<(usize, Selection)>,
    },
}

impl Selection {
    /// Number of leaves used by this selection.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Threshold { leaf_count, .. } => *leaf_count,
        }
    }
}

/// A monotone access structure: a tree of threshold gates over attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessStructure {
    Leaf(String),
    Threshold {
        k: usize,
        children: Vec<AccessStructure>,
    },
}

impl AccessStructure {
    /// Compiles an infix policy such as `(A and B) or 2 of (C, D, E)`.
    pub fn parse(infix: &str) -> Result<Self, Error> {
        Self::from_postfix(&to_postfix(infix)?)
    }

    /// Materializes a tree from a postfix token stream.
    ///
    /// A threshold token `kofn` pops the `n` last operands, which become its
    /// children in their input order. Operands are stacked along with their
    /// depth.
    pub fn from_postfix(tokens: &[Token]) -> Result<Self, Error> {
        let mut stack = Vec::<(Self, usize)>::new();
        for token in tokens {
            match token {
                Token::Attribute(name) => stack.push((Self::Leaf(name.clone()), 0)),
                Token::Threshold { k, n } => {
                    let (k, n) = (*k, *n);
                    if k < 1 || k > n {
                        return Err(Error::PolicyCompile(format!(
                            "invalid threshold {k}of{n}: expected 1 <= k <= n"
                        )));
                    }
                    if n == 1 {
                        return Err(Error::PolicyCompile(format!(
                            "invalid threshold {k}of{n}: a threshold gate needs at least two \
                             children"
                        )));
                    }
                    if n > stack.len() {
                        return Err(Error::PolicyCompile(format!(
                            "threshold {k}of{n} has only {} operands",
                            stack.len()
                        )));
                    }
                    let (children, depths): (Vec<_>, Vec<_>) =
                        stack.split_off(stack.len() - n).into_iter().unzip();
                    let depth = 1 + depths.into_iter().max().unwrap_or_default();
                    if depth > MAX_POLICY_DEPTH {
                        return Err(Error::PolicyCompile(format!(
                            "policy tree deeper than {MAX_POLICY_DEPTH}"
                        )));
                    }
                    stack.push((Self::Threshold { k, children }, depth));
                }
            }
        }

        match (stack.pop(), stack.is_empty()) {
            (Some((tree, _)), true) => Ok(tree),
            (None, _) => Err(Error::PolicyCompile("empty policy".to_string())),
            (Some(_), false) => Err(Error::PolicyCompile(format!(
                "{} disconnected sub-policies, expected a single tree",
                stack.len() + 1
            ))),
        }
    }

    /// Checks the tree invariants: a threshold `k of n` requires
    /// `1 <= k <= n` and `n >= 2`, attributes cannot be empty and the tree
    /// is at most `MAX_POLICY_DEPTH` deep.
    ///
    /// Trees built by `parse` always pass this check.
    pub fn check(&self) -> Result<(), Error> {
        self.check_at(0)
    }

    fn check_at(&self, depth: usize) -> Result<(), Error> {
        if depth > MAX_POLICY_DEPTH {
            return Err(Error::PolicyCompile(format!(
                "policy tree deeper than {MAX_POLICY_DEPTH}"
            )));
        }
        match self {
            Self::Leaf(name) if name.trim().is_empty() => {
                Err(Error::PolicyCompile("empty attribute".to_string()))
            }
            Self::Leaf(_) => Ok(()),
            Self::Threshold { k, children } => {
                let n = children.len();
                if *k < 1 || *k > n || n < 2 {
                    return Err(Error::PolicyCompile(format!(
                        "invalid threshold {k}of{n}: expected 1 <= k <= n and n >= 2"
                    )));
                }
                children
                    .iter()
                    .try_for_each(|child| child.check_at(depth + 1))
            }
        }
    }

    /// Postfix form of the tree.
    #[must_use]
    pub fn to_postfix(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        self.write_postfix(&mut tokens);
        tokens
    }

    fn write_postfix(&self, tokens: &mut Vec<Token>) {
        match self {
            Self::Leaf(name) => tokens.push(Token::Attribute(name.clone())),
            Self::Threshold { k, children } => {
                for child in children {
                    child.write_postfix(tokens);
                }
                tokens.push(Token::Threshold {
                    k: *k,
                    n: children.len(),
                });
            }
        }
    }

    /// Attributes of the leaves, left to right. Repeated attributes are
    /// listed once per leaf.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            Self::Leaf(name) => vec![name.as_str()],
            Self::Threshold { children, .. } => {
                children.iter().flat_map(Self::attributes).collect()
            }
        }
    }

    /// Returns `true` if the given attributes satisfy this access structure.
    pub fn is_satisfied_by<S: AsRef<str>>(&self, attributes: &[S]) -> bool {
        self.is_satisfied(&position_of(attributes))
    }

    /// Minimal selection of leaves satisfied by the given attributes, leaf
    /// components being indices into `attributes`.
    pub fn min_leaf_selection<S: AsRef<str>>(&self, attributes: &[S]) -> Option<Selection> {
        self.pick_min_leaves(&position_of(attributes))
    }

    fn fmt_child(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threshold { k, children } if children.len() == 2 && (*k == 1 || *k == 2) => {
                write!(f, "({self})")
            }
            _ => write!(f, "{self}"),
        }
    }
}

fn position_of<S: AsRef<str>>(attributes: &[S]) -> impl Fn(&str) -> Option<usize> + '_ {
    move |attribute| attributes.iter().position(|a| a.as_ref() == attribute)
}

impl ThresholdTree for AccessStructure {
    fn attribute(&self) -> Option<&str> {
        match self {
            Self::Leaf(name) => Some(name.as_str()),
            Self::Threshold { .. } => None,
        }
    }

    fn threshold(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Threshold { k, .. } => *k,
        }
    }

    fn children(&self) -> &[Self] {
        match self {
            Self::Leaf(_) => &[],
            Self::Threshold { children, .. } => children,
        }
    }
}

/// Infix form, parsing it back gives the same tree.
impl Display for AccessStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(name) => write!(f, "{name}"),
            Self::Threshold { k, children } if children.len() == 2 && (*k == 1 || *k == 2) => {
                children[0].fmt_child(f)?;
                write!(f, " {} ", if *k == 2 { "and" } else { "or" })?;
                children[1].fmt_child(f)
            }
            Self::Threshold { k, children } => {
                write!(f, "{k} of (")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl FromStr for AccessStructure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
