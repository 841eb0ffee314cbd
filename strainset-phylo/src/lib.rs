//! Read, write and post-process [Newick](https://en.wikipedia.org/wiki/Newick_format) phylogenies.
//!
//! ```rust
//! use strainset_phylo::{FromNewick, Phylogeny, ToNewick};
//! let mut phylo = Phylogeny::from_newick("((A:1,B:1):1,C:6);")?;
//! phylo.root_at_longest_branch()?;
//! assert_eq!(phylo.to_newick()?, "((A:1,B:1):4,C:3);");
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

use color_eyre::eyre::{Report, Result};

mod branch;
pub mod newick;
mod node;
mod phylogeny;

#[doc(inline)]
pub use branch::Branch;
#[doc(inline)]
pub use node::Node;
#[doc(inline)]
pub use phylogeny::Phylogeny;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Returns an object created from a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`].
pub trait FromNewick {
    fn from_newick(newick: &str) -> Result<Self, Report>
    where
        Self: Sized;
}

/// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`] created from an object.
pub trait ToNewick {
    fn to_newick(&self) -> Result<String, Report>;
}
