use crate::FromNewick;
use color_eyre::eyre::{Report, Result};
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A [`Node`] in the [`Phylogeny`](crate::Phylogeny) graph.
///
/// Internal nodes are frequently unlabelled, in which case `label` is empty.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Node {
    /// [`Node`] label for display.
    pub label: String,
}

#[rustfmt::skip]
impl Display for Node { fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.label) } }
#[rustfmt::skip]
impl Node { pub fn new(label: &str) -> Self { Node { label: label.to_string() } } }

impl FromNewick for Node {
    /// Returns a [`Node`] created from a [Newick](https://en.wikipedia.org/wiki/Newick_format) node [`str`].
    ///
    /// ## Examples
    ///
    /// Just a node name.
    ///
    /// ```rust
    /// use strainset_phylo::{Node, FromNewick};
    /// let node = Node::from_newick(&"A;")?;
    /// assert_eq!(node, Node::new("A"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// A node name and branch attributes.
    ///
    /// ```rust
    /// use strainset_phylo::{Node, FromNewick};
    /// let node = Node::from_newick(&"GCF_000008025.1:0.25")?;
    /// assert_eq!(node.label, "GCF_000008025.1");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Self, Report> {
        let newick = newick.replace(';', "");
        let label = newick.split(':').next().unwrap_or_default().trim();
        Ok(Node::new(label))
    }
}
