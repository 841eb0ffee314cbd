use crate::FromNewick;

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A [`Branch`] in the [`Phylogeny`](crate::Phylogeny), leading to a child node.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Branch {
    /// [`Branch`] length (ex. 0.25), 0 when absent.
    pub length: f64,
}

#[rustfmt::skip]
impl Display for Branch { fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.length) } }

#[rustfmt::skip]
impl Branch { pub fn new(length: f64) -> Self { Branch { length } } }

impl FromNewick for Branch {
    /// Returns a [`Branch`] created from a [Newick](https://en.wikipedia.org/wiki/Newick_format) node [`str`].
    ///
    /// Support values belong in the node label (ex. `)95:0.1`), so a node
    /// carries at most one `:length` attribute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use strainset_phylo::{Branch, FromNewick};
    ///
    /// assert_eq!(Branch::from_newick(&"A")?, Branch::new(0.0));
    /// assert_eq!(Branch::from_newick(&"95:0.25;")?, Branch::new(0.25));
    /// assert!(Branch::from_newick(&"A:2:0.75").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Branch, Report> {
        let newick = newick.replace(';', "");
        let length = match newick.split_once(':') {
            None => 0.0,
            Some((_, attribute)) if attribute.contains(':') => {
                return Err(eyre!("Unexpected branch attributes in newick: {newick}"))
                    .suggestion("Only a single :length is supported after each node.");
            }
            Some((_, attribute)) => attribute
                .trim()
                .parse()
                .wrap_err_with(|| format!("Failed to parse branch length from newick: {newick}"))?,
        };

        Ok(Branch { length })
    }
}
