use crate::newick::{self, Clade};
use crate::{Branch, FromNewick, Node, ToNewick};

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, warn};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::path::Path;

/// A rooted [`Phylogeny`] as a directed graph of parents and children.
///
/// Children are ordered by their node index, which follows the order they
/// were written in the source Newick string. Nodes created by rooting or
/// binarizing are appended after them.
#[derive(Clone, Debug)]
pub struct Phylogeny {
    /// Directed graph, edges point from parent to child and carry the child's [`Branch`].
    pub graph: StableGraph<Node, Branch>,
    /// Index of the root node.
    pub root: NodeIndex,
}

impl Default for Phylogeny {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Clade> for Phylogeny {
    fn from(clade: Clade) -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(clade.node.clone());
        let mut phylo = Phylogeny { graph, root };
        phylo.add_clades(root, clade.children);
        phylo
    }
}

impl FromNewick for Phylogeny {
    /// Returns a [`Phylogeny`] created from a Newick tree.
    ///
    /// ```rust
    /// use strainset_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("(A:1,(B:2,C:3)D:4)E;")?;
    /// assert_eq!(phylo.get_leaves(), ["A", "B", "C"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Self, Report> {
        Ok(Phylogeny::from(newick::parse(newick)?))
    }
}

impl ToNewick for Phylogeny {
    /// Returns the Newick string of the phylogeny.
    ///
    /// Leaf names, internal labels (when present) and branch lengths of every
    /// non-root node are written.
    ///
    /// ```rust
    /// use strainset_phylo::{FromNewick, Phylogeny, ToNewick};
    /// let phylo = Phylogeny::from_newick("(A:1,(B:2,C:3)D:4)E;")?;
    /// assert_eq!(phylo.to_newick()?, "(A:1,(B:2,C:3)D:4)E;");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn to_newick(&self) -> Result<String, Report> {
        let mut newick = String::new();
        self.write_clade(self.root, &mut newick)?;
        newick.push(';');
        Ok(newick)
    }
}

impl Phylogeny {
    /// Returns a new [`Phylogeny`] holding only an unlabelled root.
    pub fn new() -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(Node::default());
        Phylogeny { graph, root }
    }

    /// Read the first tree of a Newick file.
    pub fn read<P>(path: &P) -> Result<Phylogeny, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read tree: {path:?}"))?;
        // only the first tree is used
        let newick = match content.find(';') {
            Some(end) => &content[..=end],
            None => content.as_str(),
        };
        Phylogeny::from_newick(newick).wrap_err_with(|| format!("Failed to parse tree: {path:?}"))
    }

    /// Write the phylogeny to a Newick file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let newick = self.to_newick()?;
        std::fs::write(path, format!("{newick}\n"))
            .wrap_err_with(|| format!("Failed to write tree: {path:?}"))?;
        Ok(())
    }

    /// Returns the number of nodes in the phylogeny.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the phylogeny holds no more than its root.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() <= 1
    }

    /// Returns the index of the first node (in level order) with this label.
    pub fn get_node(&self, label: &str) -> Result<NodeIndex, Report> {
        self.levelorder()
            .into_iter()
            .find(|n| self.graph[*n].label == label)
            .ok_or_else(|| eyre!("Node {label:?} was not found in the phylogeny."))
            .suggestion("Is there a typo in the node name?")
    }

    /// Returns the children of a node, ordered by node index.
    pub fn get_children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(node, Direction::Outgoing).sorted().collect()
    }

    /// Returns the parent of a node, [`None`] for the root.
    pub fn get_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(node, Direction::Incoming).next()
    }

    /// Returns the branch leading to a node, [`None`] for the root.
    pub fn get_branch(&self, node: NodeIndex) -> Option<Branch> {
        self.graph.edges_directed(node, Direction::Incoming).next().map(|e| *e.weight())
    }

    /// Returns the labels of the leaves, left to right.
    pub fn get_leaves(&self) -> Vec<&str> {
        self.preorder()
            .into_iter()
            .filter(|n| self.get_children(*n).is_empty())
            .map(|n| self.graph[n].label.as_str())
            .collect()
    }

    /// Returns nodes in breadth-first order, starting from the root.
    pub fn levelorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            queue.extend(self.get_children(node));
        }
        order
    }

    /// Returns nodes in depth-first pre-order, starting from the root.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        self.preorder_from(self.root)
    }

    fn preorder_from(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.get_children(node).into_iter().rev());
        }
        order
    }

    /// Root the phylogeny on the node with the longest branch.
    ///
    /// Ties go to the first node in level order. Returns the label of the
    /// outgroup, or [`None`] when every branch has length zero, in which
    /// case the phylogeny is unchanged.
    ///
    /// ```rust
    /// use strainset_phylo::{FromNewick, Phylogeny, ToNewick};
    /// let mut phylo = Phylogeny::from_newick("(A:1,B:1,(C:1,D:10):2);")?;
    /// let outgroup = phylo.root_at_longest_branch()?;
    /// assert_eq!(outgroup.as_deref(), Some("D"));
    /// assert_eq!(phylo.to_newick()?, "(((A:1,B:1):2,C:1):5,D:5);");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn root_at_longest_branch(&mut self) -> Result<Option<String>, Report> {
        let mut longest: Option<(NodeIndex, f64)> = None;
        for node in self.levelorder().into_iter().skip(1) {
            let length = self.get_branch(node).unwrap_or_default().length;
            if length > longest.map(|(_, l)| l).unwrap_or(0.0) {
                longest = Some((node, length));
            }
        }

        match longest {
            Some((node, length)) => {
                let label = self.graph[node].label.clone();
                debug!("Rooting on node {label:?} with branch length {length}.");
                self.set_outgroup(node)?;
                Ok(Some(label))
            }
            None => {
                warn!("All branch lengths are zero, the phylogeny was not rerooted.");
                Ok(None)
            }
        }
    }

    /// Place a new root in the middle of the branch leading to `outgroup`.
    pub fn set_outgroup(&mut self, outgroup: NodeIndex) -> Result<(), Report> {
        let parent = self
            .get_parent(outgroup)
            .ok_or_else(|| eyre!("The root node cannot be used as the outgroup."))?;
        let branch = self.get_branch(outgroup).unwrap_or_default();
        let half = Branch::new(branch.length / 2.0);

        // path from the outgroup's parent up to the old root
        let mut path = vec![parent];
        while let Some(next) = path.last().and_then(|n| self.get_parent(*n)) {
            path.push(next);
        }
        let old_root = self.root;

        // split the outgroup branch with the new root
        let new_root = self.graph.add_node(Node::default());
        self.remove_branch(parent, outgroup)?;
        self.graph.add_edge(new_root, outgroup, half);
        self.graph.add_edge(new_root, parent, half);

        // reverse the branches between the outgroup's parent and the old root
        for (child, ancestor) in path.iter().tuple_windows() {
            let branch = self.remove_branch(*ancestor, *child)?;
            self.graph.add_edge(*child, *ancestor, branch);
        }
        self.root = new_root;

        // the old root is redundant if it is left with a single child
        let children = self.get_children(old_root);
        if children.len() == 1 {
            let child = children[0];
            let upper = self.get_parent(old_root).wrap_err("Old root has no parent after rerooting.")?;
            let inner = self.remove_branch(upper, old_root)?;
            let outer = self.remove_branch(old_root, child)?;
            self.graph.add_edge(upper, child, Branch::new(inner.length + outer.length));
            self.graph.remove_node(old_root);
        }

        Ok(())
    }

    /// Resolve every polytomy below (and including) the named node.
    ///
    /// A node with children `c1..ck` (`k > 2`) becomes a ladder of
    /// bifurcations, `(c1,(c2,(...,(ck-1,ck))))`, joined by unlabelled
    /// zero-length branches.
    ///
    /// ```rust
    /// use strainset_phylo::{FromNewick, Phylogeny, ToNewick};
    /// let mut phylo = Phylogeny::from_newick("(A:1,(B:1,C:1,D:1)E:1);")?;
    /// phylo.binarize("E")?;
    /// assert_eq!(phylo.to_newick()?, "(A:1,(B:1,(C:1,D:1):0)E:1);");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn binarize(&mut self, label: &str) -> Result<usize, Report> {
        let start = self.get_node(label)?;
        let mut resolved = 0;

        for node in self.preorder_from(start) {
            let children = self.get_children(node);
            if children.len() <= 2 {
                continue;
            }
            debug!("Resolving polytomy of {} children at node {:?}.", children.len(), self.graph[node].label);

            let mut parent = node;
            let mut rest = &children[1..];
            while rest.len() > 1 {
                let inner = self.graph.add_node(Node::default());
                self.graph.add_edge(parent, inner, Branch::default());
                self.move_branch(node, rest[0], inner)?;
                parent = inner;
                rest = &rest[1..];
            }
            self.move_branch(node, rest[0], parent)?;
            resolved += 1;
        }

        Ok(resolved)
    }

    /// Returns true if no node has more than two children.
    pub fn is_binary(&self) -> bool {
        self.graph.node_indices().all(|n| self.get_children(n).len() <= 2)
    }

    fn add_clades(&mut self, parent: NodeIndex, clades: Vec<Clade>) {
        for clade in clades {
            let node = self.graph.add_node(clade.node);
            self.graph.add_edge(parent, node, clade.branch);
            self.add_clades(node, clade.children);
        }
    }

    fn remove_branch(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<Branch, Report> {
        let edge = self
            .graph
            .find_edge(parent, child)
            .ok_or_else(|| eyre!("No branch between {parent:?} and {child:?}."))?;
        self.graph
            .remove_edge(edge)
            .ok_or_else(|| eyre!("Failed to remove branch between {parent:?} and {child:?}."))
    }

    fn move_branch(&mut self, from: NodeIndex, child: NodeIndex, to: NodeIndex) -> Result<(), Report> {
        if from != to {
            let branch = self.remove_branch(from, child)?;
            self.graph.add_edge(to, child, branch);
        }
        Ok(())
    }

    fn write_clade(&self, node: NodeIndex, newick: &mut String) -> Result<(), Report> {
        let children = self.get_children(node);
        if !children.is_empty() {
            newick.push('(');
            for (i, child) in children.into_iter().enumerate() {
                if i > 0 {
                    newick.push(',');
                }
                self.write_clade(child, newick)?;
            }
            newick.push(')');
        }
        newick.push_str(&self.graph[node].label);
        if let Some(branch) = self.get_branch(node) {
            newick.push_str(&format!(":{branch}"));
        }
        Ok(())
    }
}
