// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **Ndt Module** - *Array Type Algebra*
//!
//! Immutable descriptions of array types: dimensions, item layouts and optionality.
//!
//! ## Representation
//! - A type is an arena of nodes referenced by index. Children are always pushed before
//!   their parents, so the arena is topologically ordered and the root is any node.
//! - Sub-types share the parent's arena: [`Ndt::leaf`] and friends are O(1).
//! - Layout (`datasize`, `align`) is computed once when a node is pushed.
//!
//! ## Equality
//! Structural. Two types built through different routes compare and hash equal when
//! they describe the same tree, regardless of node numbering or unreachable nodes.
//!
//! ## Serialization
//! `Display` produces the canonical text and [`Ndt::deserialize`] parses it back:
//! `Ndt::deserialize(&t.serialize()) == Ok(t)` for every constructible `t`.

use std::fmt::{Display, Formatter, Write};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::aliases::Result;
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::structs::parser;

/// Index of a node within an [`Ndt`] arena.
pub type NodeId = u32;

/// Size of references and string slots.
pub const POINTER_SIZE: usize = 8;

/// Composite member of a tuple or record.
#[derive(Debug, Clone)]
pub struct Field {
    /// Record member name. `None` for tuple members.
    pub name: Option<Arc<str>>,
    pub ty: NodeId,
    /// Explicit `|align=n|` modifier.
    pub align: Option<usize>,
    /// Byte offset within the composite, filled in on push.
    pub offset: usize,
}

impl Field {
    pub fn new(name: Option<&str>, ty: NodeId, align: Option<usize>) -> Self {
        Self {
            name: name.map(Arc::from),
            ty,
            align,
            offset: 0,
        }
    }
}

/// Node kinds of the type algebra.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Scalar(DType),
    String,
    /// Dtype variable such as `T`, only valid in signatures.
    TypeVar(Arc<str>),
    Optional(NodeId),
    /// Dimension of known extent. `step` is in elements of the leaf item.
    FixedDim { shape: usize, step: isize, child: NodeId },
    /// Ragged dimension. `offsets` holds `n + 1` cumulative offsets into the next
    /// level, or `None` in signatures.
    VarDim { offsets: Option<Arc<[usize]>>, child: NodeId },
    /// Named dimension variable such as `N`, only valid in signatures.
    Symbolic { name: Arc<str>, child: NodeId },
    /// `...`, `Name...` or `var...`, only valid in signatures.
    Ellipsis { name: Option<Arc<str>>, var: bool, child: NodeId },
    Tuple { fields: Vec<Field>, pack: Option<usize>, align: Option<usize> },
    Record { fields: Vec<Field>, pack: Option<usize>, align: Option<usize> },
    Ref(NodeId),
    Constr { name: Arc<str>, child: NodeId },
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub datasize: usize,
    pub align: usize,
    /// Size of the innermost item below any dimensions.
    pub itemsize: usize,
    pub concrete: bool,
}

/// Dimension descriptor, outermost first as returned by [`Ndt::dims`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed { shape: usize, step: isize },
    Var { offsets: Option<Arc<[usize]>> },
    Symbolic(Arc<str>),
    Ellipsis { name: Option<Arc<str>>, var: bool },
}

impl Dim {
    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self, Dim::Var { .. })
    }

    /// Number of entries for fixed and concrete var dims.
    #[inline]
    pub fn len(&self) -> Option<usize> {
        match self {
            Dim::Fixed { shape, .. } => Some(*shape),
            Dim::Var { offsets: Some(o) } => Some(o.len().saturating_sub(1)),
            _ => None,
        }
    }
}

impl Display for Dim {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Fixed { shape, .. } => write!(f, "{shape}"),
            Dim::Var { offsets: None } => f.write_str("var"),
            Dim::Var { offsets: Some(o) } => write!(f, "var(offsets={})", list(o)),
            Dim::Symbolic(name) => f.write_str(name),
            Dim::Ellipsis { name: Some(n), .. } => write!(f, "{n}..."),
            Dim::Ellipsis { var: true, .. } => f.write_str("var..."),
            Dim::Ellipsis { .. } => f.write_str("..."),
        }
    }
}

fn list(values: &[usize]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the names the parser reads back.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[inline]
fn round_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

/// `(shape - 1) * |step| * item + inner`, or `None` past `isize::MAX` bytes.
fn fixed_datasize(shape: usize, step: isize, item: usize, inner: usize) -> Option<usize> {
    if shape == 0 {
        return Some(0);
    }
    let size = (shape - 1)
        .checked_mul(step.unsigned_abs())?
        .checked_mul(item)?
        .checked_add(inner)?;
    (size <= isize::MAX as usize).then_some(size)
}

fn check_pow2(what: &str, n: usize) -> Result<()> {
    if n == 0 || !n.is_power_of_two() {
        return Err(NdError::constraint(format!("{what}={n} is not a power of two")));
    }
    Ok(())
}

/// Incremental constructor for [`Ndt`] arenas.
#[derive(Debug, Default)]
pub struct NdtBuilder {
    nodes: Vec<NodeData>,
}

impl NdtBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[inline]
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id as usize]
    }

    fn push(&mut self, kind: NodeKind, datasize: usize, align: usize, itemsize: usize, concrete: bool) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            datasize,
            align,
            itemsize,
            concrete,
        });
        (self.nodes.len() - 1) as NodeId
    }

    fn abstract_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind, 0, 1, 0, false)
    }

    pub fn scalar(&mut self, dtype: DType) -> NodeId {
        self.push(NodeKind::Scalar(dtype), dtype.itemsize(), dtype.align(), dtype.itemsize(), true)
    }

    pub fn string(&mut self) -> NodeId {
        self.push(NodeKind::String, POINTER_SIZE, POINTER_SIZE, POINTER_SIZE, true)
    }

    pub fn typevar(&mut self, name: &str) -> NodeId {
        self.abstract_node(NodeKind::TypeVar(Arc::from(name)))
    }

    pub fn optional(&mut self, child: NodeId) -> NodeId {
        let c = self.node(child);
        let (d, a, i, k) = (c.datasize, c.align, c.itemsize, c.concrete);
        self.push(NodeKind::Optional(child), d, a, i, k)
    }

    /// Fixed dimension over `child`. Fails when `child` is a var dimension.
    pub fn fixed_dim(&mut self, shape: usize, step: isize, child: NodeId) -> Result<NodeId> {
        let c = self.node(child);
        if matches!(c.kind, NodeKind::VarDim { .. }) {
            return Err(NdError::constraint("fixed and var dimensions cannot be mixed"));
        }
        if c.concrete && fixed_datasize(shape, step, c.itemsize, c.datasize).is_none() {
            return Err(NdError::constraint(format!(
                "fixed dimension of shape {shape} and step {step} exceeds the addressable size"
            )));
        }
        Ok(self.push_fixed(shape, step, child))
    }

    fn push_fixed(&mut self, shape: usize, step: isize, child: NodeId) -> NodeId {
        let c = self.node(child);
        let (item, align, inner, concrete) = (c.itemsize, c.align, c.datasize, c.concrete);
        let kind = NodeKind::FixedDim { shape, step, child };
        if !concrete {
            return self.abstract_node(kind);
        }
        let datasize = fixed_datasize(shape, step, item, inner).unwrap_or(usize::MAX);
        self.push(kind, datasize, align, item, true)
    }

    /// Var dimension over `child`.
    ///
    /// Offsets must be non-decreasing and, when `child` is itself a concrete var
    /// dimension, the last offset must equal its number of entries.
    pub fn var_dim(&mut self, offsets: Option<Arc<[usize]>>, child: NodeId) -> Result<NodeId> {
        let c = self.node(child);
        match &c.kind {
            NodeKind::FixedDim { .. } | NodeKind::Symbolic { .. } => {
                return Err(NdError::constraint("var dimensions must be outermost"));
            }
            NodeKind::VarDim { offsets: inner, .. } => match (&offsets, inner) {
                (Some(o), Some(i)) => {
                    let last = o.last().copied().unwrap_or(0);
                    if last != i.len() - 1 {
                        return Err(NdError::constraint(format!(
                            "var offsets end at {last} but the next dimension has {} entries",
                            i.len() - 1
                        )));
                    }
                }
                (None, None) => {}
                _ => return Err(NdError::constraint("cannot mix abstract and concrete var dimensions")),
            },
            _ => {}
        }
        if let Some(o) = &offsets {
            if o.is_empty() {
                return Err(NdError::constraint("var offsets must contain at least one entry"));
            }
            if o[0] != 0 {
                return Err(NdError::constraint(format!("var offsets {} do not start at 0", list(o))));
            }
            if o.windows(2).any(|w| w[1] < w[0]) {
                return Err(NdError::constraint(format!("var offsets {} are not monotonic", list(o))));
            }
        }
        Ok(self.push_var(offsets, child))
    }

    fn push_var(&mut self, offsets: Option<Arc<[usize]>>, child: NodeId) -> NodeId {
        let c = self.node(child);
        let (item, align) = (c.itemsize, c.align);
        let concrete = offsets.is_some() && c.concrete;
        let kind = NodeKind::VarDim { offsets, child };
        if !concrete {
            return self.abstract_node(kind);
        }
        self.push(kind, item, align, item, true)
    }

    pub fn symbolic(&mut self, name: &str, child: NodeId) -> Result<NodeId> {
        if matches!(self.node(child).kind, NodeKind::VarDim { .. }) {
            return Err(NdError::constraint("var dimensions must be outermost"));
        }
        Ok(self.abstract_node(NodeKind::Symbolic { name: Arc::from(name), child }))
    }

    pub fn ellipsis(&mut self, name: Option<&str>, var: bool, child: NodeId) -> Result<NodeId> {
        if name.is_some() && var {
            return Err(NdError::constraint("a named ellipsis cannot be var"));
        }
        let mut cur = child;
        loop {
            match &self.node(cur).kind {
                NodeKind::Ellipsis { .. } => {
                    return Err(NdError::constraint("only one ellipsis is allowed per type"));
                }
                NodeKind::FixedDim { child, .. }
                | NodeKind::VarDim { child, .. }
                | NodeKind::Symbolic { child, .. } => cur = *child,
                _ => break,
            }
        }
        Ok(self.abstract_node(NodeKind::Ellipsis {
            name: name.map(Arc::from),
            var,
            child,
        }))
    }

    /// Lays out the members of a tuple or record.
    ///
    /// `pack` forces every member alignment, member `|align=n|` raises it, and the
    /// composite `align` raises the overall alignment. `pack` excludes both `align`
    /// forms.
    fn composite(&mut self, mut fields: Vec<Field>, pack: Option<usize>, align: Option<usize>, record: bool) -> Result<NodeId> {
        if let Some(p) = pack {
            check_pow2("pack", p)?;
            if align.is_some() || fields.iter().any(|f| f.align.is_some()) {
                return Err(NdError::constraint("pack and align are mutually exclusive"));
            }
        }
        if let Some(a) = align {
            check_pow2("align", a)?;
        }
        for f in &fields {
            if let Some(a) = f.align {
                check_pow2("align", a)?;
            }
        }
        let concrete = fields.iter().all(|f| self.node(f.ty).concrete);
        if concrete {
            let mut offset = 0usize;
            let mut max_align = 1usize;
            for f in fields.iter_mut() {
                let child = self.node(f.ty);
                let field_align = match pack {
                    Some(p) => p,
                    None => child.align.max(f.align.unwrap_or(1)),
                };
                offset = round_up(offset, field_align);
                f.offset = offset;
                offset += child.datasize;
                max_align = max_align.max(field_align);
            }
            if let Some(a) = align {
                max_align = max_align.max(a);
            }
            let datasize = round_up(offset, max_align);
            let kind = if record {
                NodeKind::Record { fields, pack, align }
            } else {
                NodeKind::Tuple { fields, pack, align }
            };
            return Ok(self.push(kind, datasize, max_align, datasize, true));
        }
        let kind = if record {
            NodeKind::Record { fields, pack, align }
        } else {
            NodeKind::Tuple { fields, pack, align }
        };
        Ok(self.abstract_node(kind))
    }

    pub fn tuple(&mut self, fields: Vec<Field>, pack: Option<usize>, align: Option<usize>) -> Result<NodeId> {
        self.composite(fields, pack, align, false)
    }

    pub fn record(&mut self, fields: Vec<Field>, pack: Option<usize>, align: Option<usize>) -> Result<NodeId> {
        for f in &fields {
            match f.name.as_deref() {
                None => return Err(NdError::constraint("record fields must be named")),
                Some(name) if !is_identifier(name) => {
                    return Err(NdError::constraint(format!("record field name '{name}' is not an identifier")));
                }
                Some(_) => {}
            }
        }
        self.composite(fields, pack, align, true)
    }

    pub fn reference(&mut self, child: NodeId) -> NodeId {
        let concrete = self.node(child).concrete;
        self.push(NodeKind::Ref(child), POINTER_SIZE, POINTER_SIZE, POINTER_SIZE, concrete)
    }

    pub fn constr(&mut self, name: &str, child: NodeId) -> NodeId {
        let c = self.node(child);
        let (d, a, i, k) = (c.datasize, c.align, c.itemsize, c.concrete);
        self.push(NodeKind::Constr { name: Arc::from(name), child }, d, a, i, k)
    }

    /// Copies the tree of `t` into this arena.
    pub fn import(&mut self, t: &Ndt) -> Result<NodeId> {
        self.import_node(t, t.root)
    }

    fn import_node(&mut self, t: &Ndt, id: NodeId) -> Result<NodeId> {
        Ok(match &t.node(id).kind {
            NodeKind::Scalar(d) => self.scalar(*d),
            NodeKind::String => self.string(),
            NodeKind::TypeVar(n) => self.typevar(n),
            NodeKind::Optional(c) => {
                let c = self.import_node(t, *c)?;
                self.optional(c)
            }
            NodeKind::FixedDim { shape, step, child } => {
                let c = self.import_node(t, *child)?;
                self.fixed_dim(*shape, *step, c)?
            }
            NodeKind::VarDim { offsets, child } => {
                let c = self.import_node(t, *child)?;
                self.var_dim(offsets.clone(), c)?
            }
            NodeKind::Symbolic { name, child } => {
                let c = self.import_node(t, *child)?;
                self.symbolic(name, c)?
            }
            NodeKind::Ellipsis { name, var, child } => {
                let c = self.import_node(t, *child)?;
                self.ellipsis(name.as_deref(), *var, c)?
            }
            NodeKind::Tuple { fields, pack, align } | NodeKind::Record { fields, pack, align } => {
                let mut copied = Vec::with_capacity(fields.len());
                for f in fields {
                    let ty = self.import_node(t, f.ty)?;
                    copied.push(Field::new(f.name.as_deref(), ty, f.align));
                }
                if matches!(t.node(id).kind, NodeKind::Record { .. }) {
                    self.record(copied, *pack, *align)?
                } else {
                    self.tuple(copied, *pack, *align)?
                }
            }
            NodeKind::Ref(c) => {
                let c = self.import_node(t, *c)?;
                self.reference(c)
            }
            NodeKind::Constr { name, child } => {
                let c = self.import_node(t, *child)?;
                self.constr(name, c)
            }
        })
    }

    /// Pushes `dims` (outermost first) over `child`.
    pub fn dims(&mut self, dims: &[Dim], child: NodeId) -> Result<NodeId> {
        let mut cur = child;
        for d in dims.iter().rev() {
            cur = match d {
                Dim::Fixed { shape, step } => self.fixed_dim(*shape, *step, cur)?,
                Dim::Var { offsets } => self.var_dim(offsets.clone(), cur)?,
                Dim::Symbolic(n) => self.symbolic(n, cur)?,
                Dim::Ellipsis { name, var } => self.ellipsis(name.as_deref(), *var, cur)?,
            };
        }
        Ok(cur)
    }

    pub fn finish(self, root: NodeId) -> Ndt {
        Ndt {
            nodes: Arc::from(self.nodes),
            root,
        }
    }
}

/// # Ndt
///
/// Immutable array type. Cheap to clone.
///
/// ```rust
/// use ndufunc::Ndt;
///
/// let t: Ndt = "2 * 3 * float64".parse().unwrap();
/// assert_eq!(t.shape(), Some(vec![2, 3]));
/// assert_eq!(t.strides(), Some(vec![24, 8]));
/// assert!(t.is_c_contiguous());
/// ```
#[derive(Debug, Clone)]
pub struct Ndt {
    nodes: Arc<[NodeData]>,
    root: NodeId,
}

impl Ndt {
    /// Parses the canonical text form.
    pub fn deserialize(text: &str) -> Result<Ndt> {
        parser::parse_type(text)
    }

    /// Canonical text form.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    pub fn primitive(dtype: DType) -> Ndt {
        let mut b = NdtBuilder::new();
        let id = b.scalar(dtype);
        b.finish(id)
    }

    /// `?dtype`
    pub fn optional(dtype: DType) -> Ndt {
        let mut b = NdtBuilder::new();
        let id = b.scalar(dtype);
        let id = b.optional(id);
        b.finish(id)
    }

    /// Builds `dims * leaf`.
    pub fn from_dims(dims: &[Dim], leaf: &Ndt) -> Result<Ndt> {
        let mut b = NdtBuilder::new();
        let child = b.import(leaf)?;
        let root = b.dims(dims, child)?;
        Ok(b.finish(root))
    }

    /// C-contiguous fixed-dimension array of `leaf`.
    pub fn fixed(shape: &[usize], leaf: &Ndt) -> Result<Ndt> {
        let dims: Vec<Dim> = shape
            .iter()
            .zip(run_c_steps(shape))
            .map(|(&shape, step)| Dim::Fixed { shape, step })
            .collect();
        Ndt::from_dims(&dims, leaf)
    }

    /// C-contiguous `shape * dtype`, or `shape * ?dtype`.
    pub(crate) fn contiguous(shape: &[usize], dtype: DType, optional: bool) -> Ndt {
        let mut b = NdtBuilder::new();
        let mut cur = b.scalar(dtype);
        if optional {
            cur = b.optional(cur);
        }
        for (&n, step) in shape.iter().zip(run_c_steps(shape)).rev() {
            cur = b.push_fixed(n, step, cur);
        }
        b.finish(cur)
    }

    /// Nested var dimensions over a primitive leaf. Offsets must already be checked.
    pub(crate) fn ragged(offsets: &[Vec<usize>], dtype: DType, optional: bool) -> Ndt {
        let mut b = NdtBuilder::new();
        let mut cur = b.scalar(dtype);
        if optional {
            cur = b.optional(cur);
        }
        for o in offsets.iter().rev() {
            cur = b.push_var(Some(Arc::from(o.as_slice())), cur);
        }
        b.finish(cur)
    }

    /// Same type with the leaf wrapped in `?` unless it already is optional.
    pub fn to_optional(&self) -> Result<Ndt> {
        if self.is_optional() {
            return Ok(self.clone());
        }
        let leaf = self.leaf();
        let mut b = NdtBuilder::new();
        let inner = b.import(&leaf)?;
        let opt = b.optional(inner);
        let root = b.dims(&self.dims(), opt)?;
        Ok(b.finish(root))
    }

    #[inline]
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id as usize]
    }

    #[inline]
    fn at(&self, id: NodeId) -> Ndt {
        Ndt {
            nodes: self.nodes.clone(),
            root: id,
        }
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.node(self.root).kind
    }

    /// The value type below a top-level `?`, or `self`.
    pub fn strip_optional(&self) -> Ndt {
        match self.kind() {
            NodeKind::Optional(c) => self.at(*c),
            _ => self.clone(),
        }
    }

    /// Total size in bytes. Zero for abstract types.
    #[inline]
    pub fn datasize(&self) -> usize {
        self.node(self.root).datasize
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.node(self.root).align
    }

    /// Size of the item below all dimensions.
    #[inline]
    pub fn itemsize(&self) -> usize {
        self.node(self.root).itemsize
    }

    /// `false` when any part is a variable, ellipsis or unresolved var dimension.
    #[inline]
    pub fn is_concrete(&self) -> bool {
        self.node(self.root).concrete
    }

    /// Dimensions from the outermost inward, stopping at the first non-dimension node.
    pub fn dims(&self) -> Vec<Dim> {
        let mut out = Vec::new();
        let mut cur = self.root;
        loop {
            match &self.node(cur).kind {
                NodeKind::FixedDim { shape, step, child } => {
                    out.push(Dim::Fixed { shape: *shape, step: *step });
                    cur = *child;
                }
                NodeKind::VarDim { offsets, child } => {
                    out.push(Dim::Var { offsets: offsets.clone() });
                    cur = *child;
                }
                NodeKind::Symbolic { name, child } => {
                    out.push(Dim::Symbolic(name.clone()));
                    cur = *child;
                }
                NodeKind::Ellipsis { name, var, child } => {
                    out.push(Dim::Ellipsis { name: name.clone(), var: *var });
                    cur = *child;
                }
                _ => return out,
            }
        }
    }

    /// The item type below all dimensions.
    pub fn leaf(&self) -> Ndt {
        let mut cur = self.root;
        while let NodeKind::FixedDim { child, .. }
        | NodeKind::VarDim { child, .. }
        | NodeKind::Symbolic { child, .. }
        | NodeKind::Ellipsis { child, .. } = &self.node(cur).kind
        {
            cur = *child;
        }
        self.at(cur)
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims().len()
    }

    /// Primitive dtype of the leaf, looking through `?`.
    pub fn dtype(&self) -> Option<DType> {
        let leaf = self.leaf();
        match leaf.kind() {
            NodeKind::Scalar(d) => Some(*d),
            NodeKind::Optional(c) => match &leaf.node(*c).kind {
                NodeKind::Scalar(d) => Some(*d),
                _ => None,
            },
            _ => None,
        }
    }

    /// True when the leaf carries a null channel.
    pub fn is_optional(&self) -> bool {
        matches!(self.leaf().kind(), NodeKind::Optional(_))
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind(), NodeKind::VarDim { .. })
    }

    /// Extents of a fixed-dimension type.
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.dims()
            .iter()
            .map(|d| match d {
                Dim::Fixed { shape, .. } => Some(*shape),
                _ => None,
            })
            .collect()
    }

    /// Steps in elements of a fixed-dimension type.
    pub fn steps(&self) -> Option<Vec<isize>> {
        self.dims()
            .iter()
            .map(|d| match d {
                Dim::Fixed { step, .. } => Some(*step),
                _ => None,
            })
            .collect()
    }

    /// Strides in bytes of a concrete fixed-dimension type.
    pub fn strides(&self) -> Option<Vec<isize>> {
        if !self.is_concrete() {
            return None;
        }
        let item = self.itemsize() as isize;
        self.steps().map(|s| s.into_iter().map(|x| x * item).collect())
    }

    /// Number of logical elements: product of fixed extents, or the leaf count of a
    /// ragged type.
    pub fn nelems(&self) -> Option<usize> {
        if self.is_var() {
            return self.var_leaf_range().map(|(lo, hi)| hi - lo);
        }
        self.shape().map(|s| s.iter().product())
    }

    /// Index range `[lo, hi)` in the leaf data addressed by a concrete ragged type.
    pub fn var_leaf_range(&self) -> Option<(usize, usize)> {
        let mut range: Option<(usize, usize)> = None;
        for d in self.dims() {
            let Dim::Var { offsets: Some(o) } = d else {
                return None;
            };
            let (lo, hi) = range.unwrap_or((0, o.len() - 1));
            range = Some((*o.get(lo)?, *o.get(hi)?));
        }
        range
    }

    /// Concrete fixed dims whose steps equal the C-order default.
    /// Steps of single-element dims are ignored.
    pub fn is_c_contiguous(&self) -> bool {
        self.steps_match(run_c_steps)
    }

    /// Concrete fixed dims whose steps equal the Fortran-order default.
    pub fn is_f_contiguous(&self) -> bool {
        self.steps_match(run_f_steps)
    }

    fn steps_match(&self, defaults: fn(&[usize]) -> Vec<isize>) -> bool {
        if !self.is_concrete() {
            return false;
        }
        match (self.shape(), self.steps()) {
            (Some(shape), Some(steps)) => shape
                .iter()
                .zip(&steps)
                .zip(defaults(&shape))
                .all(|((&n, &s), d)| n <= 1 || s == d),
            _ => false,
        }
    }

    fn node_eq(&self, a: NodeId, other: &Ndt, b: NodeId) -> bool {
        use NodeKind::*;
        match (&self.node(a).kind, &other.node(b).kind) {
            (Scalar(x), Scalar(y)) => x == y,
            (String, String) => true,
            (TypeVar(x), TypeVar(y)) => x == y,
            (Optional(x), Optional(y)) | (Ref(x), Ref(y)) => self.node_eq(*x, other, *y),
            (FixedDim { shape: s1, step: t1, child: c1 }, FixedDim { shape: s2, step: t2, child: c2 }) => {
                s1 == s2 && t1 == t2 && self.node_eq(*c1, other, *c2)
            }
            (VarDim { offsets: o1, child: c1 }, VarDim { offsets: o2, child: c2 }) => {
                o1 == o2 && self.node_eq(*c1, other, *c2)
            }
            (Symbolic { name: n1, child: c1 }, Symbolic { name: n2, child: c2 })
            | (Constr { name: n1, child: c1 }, Constr { name: n2, child: c2 }) => {
                n1 == n2 && self.node_eq(*c1, other, *c2)
            }
            (Ellipsis { name: n1, var: v1, child: c1 }, Ellipsis { name: n2, var: v2, child: c2 }) => {
                n1 == n2 && v1 == v2 && self.node_eq(*c1, other, *c2)
            }
            (Tuple { fields: f1, pack: p1, align: a1 }, Tuple { fields: f2, pack: p2, align: a2 })
            | (Record { fields: f1, pack: p1, align: a1 }, Record { fields: f2, pack: p2, align: a2 }) => {
                p1 == p2
                    && a1 == a2
                    && f1.len() == f2.len()
                    && f1.iter().zip(f2).all(|(x, y)| {
                        x.name == y.name && x.align == y.align && self.node_eq(x.ty, other, y.ty)
                    })
            }
            _ => false,
        }
    }

    fn node_hash<H: Hasher>(&self, id: NodeId, state: &mut H) {
        let kind = &self.node(id).kind;
        std::mem::discriminant(kind).hash(state);
        match kind {
            NodeKind::Scalar(d) => d.hash(state),
            NodeKind::String => {}
            NodeKind::TypeVar(n) => n.hash(state),
            NodeKind::Optional(c) | NodeKind::Ref(c) => self.node_hash(*c, state),
            NodeKind::FixedDim { shape, step, child } => {
                shape.hash(state);
                step.hash(state);
                self.node_hash(*child, state);
            }
            NodeKind::VarDim { offsets, child } => {
                offsets.hash(state);
                self.node_hash(*child, state);
            }
            NodeKind::Symbolic { name, child } | NodeKind::Constr { name, child } => {
                name.hash(state);
                self.node_hash(*child, state);
            }
            NodeKind::Ellipsis { name, var, child } => {
                name.hash(state);
                var.hash(state);
                self.node_hash(*child, state);
            }
            NodeKind::Tuple { fields, pack, align } | NodeKind::Record { fields, pack, align } => {
                pack.hash(state);
                align.hash(state);
                for f in fields {
                    f.name.hash(state);
                    f.align.hash(state);
                    self.node_hash(f.ty, state);
                }
            }
        }
    }

    fn write_node(&self, id: NodeId, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.node(id).kind {
            NodeKind::Scalar(d) => f.write_str(d.name()),
            NodeKind::String => f.write_str("string"),
            NodeKind::TypeVar(n) => f.write_str(n),
            NodeKind::Optional(c) => {
                f.write_char('?')?;
                self.write_node(*c, f)
            }
            NodeKind::FixedDim { .. } => self.write_fixed_run(id, f),
            NodeKind::VarDim { offsets, child } => {
                match offsets {
                    None => f.write_str("var * ")?,
                    Some(o) => write!(f, "var(offsets={}) * ", list(o))?,
                }
                self.write_node(*child, f)
            }
            NodeKind::Symbolic { name, child } => {
                write!(f, "{name} * ")?;
                self.write_node(*child, f)
            }
            NodeKind::Ellipsis { name, var, child } => {
                match (name, var) {
                    (Some(n), _) => write!(f, "{n}... * ")?,
                    (None, true) => f.write_str("var... * ")?,
                    (None, false) => f.write_str("... * ")?,
                }
                self.write_node(*child, f)
            }
            NodeKind::Tuple { fields, pack, align } => {
                f.write_char('(')?;
                self.write_fields(fields, *pack, *align, f)?;
                f.write_char(')')
            }
            NodeKind::Record { fields, pack, align } => {
                f.write_char('{')?;
                self.write_fields(fields, *pack, *align, f)?;
                f.write_char('}')
            }
            NodeKind::Ref(c) => {
                f.write_str("ref(")?;
                self.write_node(*c, f)?;
                f.write_char(')')
            }
            NodeKind::Constr { name, child } => {
                write!(f, "{name}(")?;
                self.write_node(*child, f)?;
                f.write_char(')')
            }
        }
    }

    fn write_fields(&self, fields: &[Field], pack: Option<usize>, align: Option<usize>, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(n) = &field.name {
                write!(f, "{n} : ")?;
            }
            self.write_node(field.ty, f)?;
            if let Some(a) = field.align {
                write!(f, " |align={a}|")?;
            }
        }
        let sep = if fields.is_empty() { "" } else { ", " };
        if let Some(p) = pack {
            write!(f, "{sep}pack={p}")?;
        }
        if let Some(a) = align {
            write!(f, "{sep}align={a}")?;
        }
        Ok(())
    }

    /// Writes a run of consecutive fixed dimensions: plain extents for C-order steps,
    /// a `!` prefix for Fortran order, `fixed(shape=, step=)` otherwise.
    fn write_fixed_run(&self, id: NodeId, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut shape = Vec::new();
        let mut steps = Vec::new();
        let mut cur = id;
        while let NodeKind::FixedDim { shape: n, step, child } = &self.node(cur).kind {
            shape.push(*n);
            steps.push(*step);
            cur = *child;
        }
        let c = run_c_steps(&shape);
        let fortran = run_f_steps(&shape);
        if shape.len() >= 2 && steps != c && steps == fortran {
            f.write_char('!')?;
            for n in &shape {
                write!(f, "{n} * ")?;
            }
        } else {
            for ((n, s), default) in shape.iter().zip(&steps).zip(&c) {
                if s == default {
                    write!(f, "{n} * ")?;
                } else {
                    write!(f, "fixed(shape={n}, step={s}) * ")?;
                }
            }
        }
        self.write_node(cur, f)
    }
}

/// Default steps the parser assigns to a run of plain fixed dims in C order.
/// Single-element and empty dims carry step 0.
pub(crate) fn run_c_steps(shape: &[usize]) -> Vec<isize> {
    let mut steps = vec![0isize; shape.len()];
    let mut acc = 1usize;
    for i in (0..shape.len()).rev() {
        steps[i] = if shape[i] > 1 { isize::try_from(acc).unwrap_or(isize::MAX) } else { 0 };
        acc = acc.saturating_mul(shape[i]);
    }
    steps
}

/// Default steps for a `!` prefixed run in Fortran order.
pub(crate) fn run_f_steps(shape: &[usize]) -> Vec<isize> {
    let mut steps = vec![0isize; shape.len()];
    let mut acc = 1usize;
    for i in 0..shape.len() {
        steps[i] = if shape[i] > 1 { isize::try_from(acc).unwrap_or(isize::MAX) } else { 0 };
        acc = acc.saturating_mul(shape[i]);
    }
    steps
}

impl PartialEq for Ndt {
    fn eq(&self, other: &Self) -> bool {
        self.node_eq(self.root, other, other.root)
    }
}

impl Eq for Ndt {}

impl Hash for Ndt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node_hash(self.root, state);
    }
}

impl Display for Ndt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_node(self.root, f)
    }
}

impl FromStr for Ndt {
    type Err = NdError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse_type(s)
    }
}

impl From<DType> for Ndt {
    fn from(d: DType) -> Self {
        Ndt::primitive(d)
    }
}
