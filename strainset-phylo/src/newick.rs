//! Parse [Newick](https://en.wikipedia.org/wiki/Newick_format) strings into nested [`Clade`]s.

use crate::{Branch, FromNewick, Node};
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;

/// A subtree parsed from a Newick string, before it is loaded into a [`Phylogeny`](crate::Phylogeny).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clade {
    /// Label of the subtree root.
    pub node: Node,
    /// Branch leading to the subtree root.
    pub branch: Branch,
    /// Child clades, in the order they were written.
    pub children: Vec<Clade>,
}

/// Returns the [`Clade`] of a single Newick tree.
///
/// The trailing `;` is optional. Line breaks are ignored, so trees wrapped
/// over several lines are accepted.
///
/// # Examples
///
/// ```rust
/// use strainset_phylo::newick;
/// let clade = newick::parse("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;")?;
/// assert_eq!(clade.node.label, "F");
/// assert_eq!(clade.children.len(), 3);
/// assert_eq!(clade.children[2].node.label, "E");
/// assert_eq!(clade.children[2].branch.length, 0.5);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// Unbalanced parentheses are an error.
///
/// ```rust
/// use strainset_phylo::newick;
/// assert!(newick::parse("((A,B);").is_err());
/// assert!(newick::parse("(A,B));").is_err());
/// ```
pub fn parse(newick: &str) -> Result<Clade, Report> {
    let newick: String = newick.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let newick = newick.trim();
    let body = newick.strip_suffix(';').unwrap_or(newick).trim_end();

    if body.is_empty() {
        return Err(eyre!("Newick string is empty."));
    }

    let mut pos = 0;
    let clade = parse_clade(body, &mut pos)?;
    if pos != body.len() {
        return Err(eyre!("Unexpected content at position {pos} of newick: {newick}")
            .suggestion("Is there an extra closing parenthesis or a second tree?"));
    }

    Ok(clade)
}

/// Recursively parse the clade starting at `pos`, leaving `pos` on the delimiter that ends it.
fn parse_clade(newick: &str, pos: &mut usize) -> Result<Clade, Report> {
    let bytes = newick.as_bytes();
    let mut children = Vec::new();

    if bytes.get(*pos) == Some(&b'(') {
        *pos += 1;
        loop {
            children.push(parse_clade(newick, pos)?);
            match bytes.get(*pos) {
                Some(b',') => *pos += 1,
                Some(b')') => {
                    *pos += 1;
                    break;
                }
                _ => {
                    return Err(eyre!(
                        "Failed to find matching parentheses at position {pos} of newick: {newick}"
                    ))
                }
            }
        }
    }

    // label and branch attributes run until the next delimiter
    let start = *pos;
    while let Some(c) = bytes.get(*pos) {
        if matches!(c, b',' | b'(' | b')' | b';') {
            break;
        }
        *pos += 1;
    }
    let text = &newick[start..*pos];

    Ok(Clade { node: Node::from_newick(text)?, branch: Branch::from_newick(text)?, children })
}
